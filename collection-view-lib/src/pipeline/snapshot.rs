//! Reconciled data sets

use std::collections::HashMap;

use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;
use crate::model::Value;

/// Bookkeeping for one row, keyed by its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowPosition {
    /// Index of the row in the raw data set it arrived in.
    pub source_index: usize,
    /// Index of the row in visual (sorted) order.
    pub order: usize,
    pub index_path: IndexPath,
}

/// A group of rows sharing a section identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Grouping value, or `None` when no section field is configured.
    pub identifier: Option<Value>,
    pub(super) rows: Vec<usize>,
}

impl Section {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An immutable, reconciled view of one data set.
///
/// Rows are kept in their raw order; visual order, sections and the identity
/// index are derived side tables.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub(super) source: Vec<Row>,
    pub(super) keys: Vec<RowKey>,
    pub(super) order: Vec<usize>,
    pub(super) sections: Vec<Section>,
    pub(super) positions: HashMap<RowKey, RowPosition>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn number_of_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn number_of_rows(&self, section: usize) -> usize {
        self.sections.get(section).map(Section::len).unwrap_or(0)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn source_index_at(&self, index_path: IndexPath) -> Option<usize> {
        let order = *self.sections.get(index_path.section)?.rows.get(index_path.row)?;
        self.order.get(order).copied()
    }

    pub fn row_at(&self, index_path: IndexPath) -> Option<&Row> {
        self.source.get(self.source_index_at(index_path)?)
    }

    pub fn key_at(&self, index_path: IndexPath) -> Option<&RowKey> {
        self.keys.get(self.source_index_at(index_path)?)
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.positions.contains_key(key)
    }

    pub fn position(&self, key: &RowKey) -> Option<&RowPosition> {
        self.positions.get(key)
    }

    pub fn index_path_for(&self, key: &RowKey) -> Option<IndexPath> {
        self.positions.get(key).map(|p| p.index_path)
    }

    pub fn row(&self, key: &RowKey) -> Option<&Row> {
        self.source.get(self.positions.get(key)?.source_index)
    }

    /// Returns the identity of the row at `index` in the raw data set.
    pub fn key_for_source(&self, index: usize) -> Option<&RowKey> {
        self.keys.get(index)
    }

    /// Returns the first item in visual order.
    pub fn first_key(&self) -> Option<&RowKey> {
        self.key_at(IndexPath::new(0, 0))
    }

    /// Rows in raw arrival order.
    pub fn source_rows(&self) -> &[Row] {
        &self.source
    }

    /// Iterates `(key, row)` pairs in visual order.
    pub fn ordered(&self) -> impl Iterator<Item = (&RowKey, &Row)> + '_ {
        self.sections
            .iter()
            .flat_map(|section| section.rows.iter())
            .map(|&o| self.order[o])
            .map(|i| (&self.keys[i], &self.source[i]))
    }

    /// Rows in visual order, as published back to the host.
    pub fn sorted_rows(&self) -> Vec<Row> {
        self.ordered().map(|(_, row)| row.clone()).collect()
    }

    /// Iterates every index path, section by section.
    pub fn index_paths(&self) -> impl Iterator<Item = IndexPath> + '_ {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(s, section)| (0..section.len()).map(move |r| IndexPath::new(s, r)))
    }
}
