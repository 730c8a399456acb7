//! Sorting, sectioning and layout diffing

use std::collections::HashMap;

use super::RowPosition;
use super::Section;
use super::Snapshot;
use crate::config::CollectionConfig;
use crate::error::ReconcileError;
use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;
use crate::model::Value;

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOrder {
    pub field: String,
    pub ascending: bool,
}

/// Settings that shape how raw rows become a [`Snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub uid_field: String,
    pub sort: Option<SortOrder>,
    pub section_field: Option<String>,
    /// Fields whose changes alter item geometry.
    pub size_fields: Vec<String>,
}

impl ReconcileOptions {
    pub fn new(uid_field: impl Into<String>) -> Self {
        Self {
            uid_field: uid_field.into(),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some(SortOrder {
            field: field.into(),
            ascending,
        });
        self
    }

    pub fn with_section_field(mut self, field: impl Into<String>) -> Self {
        self.section_field = Some(field.into());
        self
    }

    pub fn with_size_field(mut self, field: impl Into<String>) -> Self {
        self.size_fields.push(field.into());
        self
    }
}

impl From<&CollectionConfig> for ReconcileOptions {
    fn from(config: &CollectionConfig) -> Self {
        Self {
            uid_field: config.uid_field.clone(),
            sort: config.sort_field.as_ref().filter(|f| !f.is_empty()).map(|field| SortOrder {
                field: field.clone(),
                ascending: config.sort_ascending,
            }),
            section_field: config.section_field.clone().filter(|f| !f.is_empty()),
            size_fields: config.size_fields(),
        }
    }
}

/// Builds a snapshot: identity check, stable sort, then sections in
/// first-seen order over the sorted sequence.
pub fn build_snapshot(rows: Vec<Row>, options: &ReconcileOptions) -> Result<Snapshot, ReconcileError> {
    let mut keys = Vec::with_capacity(rows.len());
    let mut seen: HashMap<RowKey, usize> = HashMap::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let key = row
            .key(&options.uid_field)
            .map_err(|_| ReconcileError::missing_uid(index, &options.uid_field))?;
        if let Some(first) = seen.insert(key.clone(), index) {
            return Err(ReconcileError::DuplicateUid {
                key,
                first,
                second: index,
            });
        }
        keys.push(key);
    }

    let order = sort_order(&rows, options.sort.as_ref());
    let sections = group_sections(&rows, &order, options.section_field.as_deref());

    let mut positions = HashMap::with_capacity(rows.len());
    for (s, section) in sections.iter().enumerate() {
        for (r, &o) in section.rows.iter().enumerate() {
            let source_index = order[o];
            positions.insert(
                keys[source_index].clone(),
                RowPosition {
                    source_index,
                    order: o,
                    index_path: IndexPath::new(s, r),
                },
            );
        }
    }

    Ok(Snapshot {
        source: rows,
        keys,
        order,
        sections,
        positions,
    })
}

/// Returns raw indices in visual order. Ties keep their raw order.
pub fn sort_order(rows: &[Row], sort: Option<&SortOrder>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    if let Some(sort) = sort {
        order.sort_by(|&a, &b| {
            let left = rows[a].get(&sort.field).unwrap_or(&NULL);
            let right = rows[b].get(&sort.field).unwrap_or(&NULL);
            let ordering = left.compare(right);
            if sort.ascending { ordering } else { ordering.reverse() }
        });
    }
    order
}

/// Buckets rows (given in visual order) into sections.
///
/// Without a section field every row lands in a single section, and an
/// empty data set has no sections at all.
pub fn group_sections(rows: &[Row], order: &[usize], field: Option<&str>) -> Vec<Section> {
    let Some(field) = field else {
        if order.is_empty() {
            return Vec::new();
        }
        return vec![Section {
            identifier: None,
            rows: (0..order.len()).collect(),
        }];
    };

    let mut sections: Vec<Section> = Vec::new();
    for (o, &source) in order.iter().enumerate() {
        let value = rows[source].value(field);
        match sections.iter().position(|s| s.identifier.as_ref() == Some(&value)) {
            Some(index) => sections[index].rows.push(o),
            None => sections.push(Section {
                identifier: Some(value),
                rows: vec![o],
            }),
        }
    }
    sections
}

/// Decides whether moving from `previous` to `next` needs a layout pass.
///
/// Compares position by position in visual order: identity, section value
/// and every size-affecting field must match.
pub fn requires_layout(previous: &Snapshot, next: &Snapshot, options: &ReconcileOptions) -> bool {
    if previous.len() != next.len() || previous.number_of_sections() != next.number_of_sections() {
        return true;
    }

    let compared_fields: Vec<&str> = options
        .section_field
        .iter()
        .chain(options.size_fields.iter())
        .map(String::as_str)
        .collect();

    previous.ordered().zip(next.ordered()).any(|((old_key, old_row), (new_key, new_row))| {
        old_key != new_key
            || compared_fields
                .iter()
                .any(|field| old_row.get(field).unwrap_or(&NULL) != new_row.get(field).unwrap_or(&NULL))
    })
}
