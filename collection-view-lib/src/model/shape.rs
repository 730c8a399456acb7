//! Data shapes and typed row tables

use serde::Deserialize;
use serde::Serialize;

use super::Row;
use super::Value;

/// Base type of a data shape field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BaseType {
    #[default]
    String,
    Guid,
    Number,
    Integer,
    Long,
    Boolean,
    #[serde(other)]
    Other,
}

impl BaseType {
    /// Returns `true` for types whose new identities are generated by counting.
    pub fn is_numeric(&self) -> bool {
        matches!(self, BaseType::Number | BaseType::Integer | BaseType::Long)
    }
}

/// One field of a data shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub base_type: BaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, base_type: BaseType) -> Self {
        Self {
            name: name.into(),
            base_type,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Ordered field definitions describing the rows of a data set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataShape {
    fields: Vec<FieldDefinition>,
}

impl DataShape {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    /// Adds a field definition (builder pattern).
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Rows together with an optional shape.
///
/// This is the value published as the `Data` property and the value handed to
/// templates bound to the whole row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_shape: Option<DataShape>,
    pub rows: Vec<Row>,
}

impl RowTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            data_shape: None,
            rows,
        }
    }

    /// Creates a single-row table.
    pub fn single(row: Row, data_shape: Option<DataShape>) -> Self {
        Self {
            data_shape,
            rows: vec![row],
        }
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }
}
