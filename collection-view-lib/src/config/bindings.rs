//! Row field to template parameter bindings

use std::collections::BTreeMap;

use log::warn;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::model::DataShape;
use crate::model::Row;
use crate::model::RowTable;
use crate::model::Value;

/// Binding key that exposes the entire row as a single-row table.
pub const ROW_BINDING: &str = "@row";

/// Maps row fields to named template parameters.
///
/// The map arrives from the host as a serialized JSON object, e.g.
/// `{"name": "Title", "@row": "Item"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterBindings {
    map: BTreeMap<String, String>,
}

impl ParameterBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding (builder pattern).
    pub fn with(mut self, field: impl Into<String>, parameter: impl Into<String>) -> Self {
        self.map.insert(field.into(), parameter.into());
        self
    }

    /// Parses a serialized binding map. Blank input yields an empty map.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json).map_err(|e| ConfigError::MalformedBindings(e.to_string()))
    }

    /// Parses a serialized binding map, falling back to an empty map.
    pub fn parse_or_empty(json: Option<&str>) -> Self {
        match json.map(Self::parse) {
            None => Self::default(),
            Some(Ok(bindings)) => bindings,
            Some(Err(e)) => {
                warn!("{}; using no bindings", e);
                Self::default()
            }
        }
    }

    /// Iterates `(field, parameter)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(f, p)| (f.as_str(), p.as_str()))
    }

    /// Returns every row field bound to `parameter`.
    pub fn fields_for<'a>(&'a self, parameter: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.map
            .iter()
            .filter(move |(_, p)| p.as_str() == parameter)
            .map(|(f, _)| f.as_str())
    }

    pub fn parameter_for(&self, field: &str) -> Option<&str> {
        self.map.get(field).map(|p| p.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Computes the parameter values a row supplies to its template.
    pub fn parameters_for(&self, row: &Row, data_shape: Option<&DataShape>) -> Vec<(String, Value)> {
        self.map
            .iter()
            .map(|(field, parameter)| {
                let value = if field == ROW_BINDING {
                    Value::Table(RowTable::single(row.clone(), data_shape.cloned()))
                } else {
                    row.value(field)
                };
                (parameter.clone(), value)
            })
            .collect()
    }
}
