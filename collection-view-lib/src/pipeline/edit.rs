//! Data edits resolved through row bookkeeping
//!
//! Each operation takes the committed snapshot and returns the new raw row
//! list. Index paths are translated to raw positions with the snapshot's
//! side table, so edits stay correct while the view is sorted or sectioned.

use uuid::Uuid;

use super::Snapshot;
use crate::error::ReconcileError;
use crate::model::DataShape;
use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;
use crate::model::Value;

/// Where a newly created item goes in the raw data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Beginning,
    End,
    /// Raw data index, clamped to the data length.
    Index(usize),
}

fn source_index(snapshot: &Snapshot, index_path: IndexPath) -> Result<usize, ReconcileError> {
    snapshot
        .key_at(index_path)
        .and_then(|key| snapshot.position(key))
        .map(|p| p.source_index)
        .ok_or(ReconcileError::IndexOutOfRange(index_path))
}

/// Raw index an item dropped at `index_path` is inserted at. An index path
/// one past the end of a section appends after its last row.
fn insertion_index(snapshot: &Snapshot, index_path: IndexPath) -> Result<usize, ReconcileError> {
    if let Ok(index) = source_index(snapshot, index_path) {
        return Ok(index);
    }
    let rows = snapshot.number_of_rows(index_path.section);
    if rows > 0 && index_path.row == rows {
        return Ok(source_index(snapshot, IndexPath::new(index_path.section, rows - 1))? + 1);
    }
    if snapshot.is_empty() && index_path == IndexPath::default() {
        return Ok(0);
    }
    Err(ReconcileError::IndexOutOfRange(index_path))
}

fn section_value(snapshot: &Snapshot, section: usize) -> Value {
    snapshot
        .sections()
        .get(section)
        .and_then(|s| s.identifier.clone())
        .unwrap_or(Value::Null)
}

/// Applies field changes to the row identified by `key`.
pub fn patch_row(snapshot: &Snapshot, key: &RowKey, patch: &Row) -> Result<Vec<Row>, ReconcileError> {
    let index = snapshot
        .position(key)
        .map(|p| p.source_index)
        .ok_or_else(|| ReconcileError::UnknownKey(key.clone()))?;
    let mut rows = snapshot.source_rows().to_vec();
    rows[index].merge(patch);
    Ok(rows)
}

/// Inserts rows after the item at `after`, or at the end when `after` is
/// `None`. Inserted rows take the target's section value.
pub fn insert_rows(
    snapshot: &Snapshot,
    mut inserted: Vec<Row>,
    after: Option<IndexPath>,
    section_field: Option<&str>,
) -> Result<Vec<Row>, ReconcileError> {
    let mut rows = snapshot.source_rows().to_vec();
    let index = match after {
        None => rows.len(),
        Some(index_path) => {
            let index = source_index(snapshot, index_path)?;
            if let Some(field) = section_field {
                let value = section_value(snapshot, index_path.section);
                for row in &mut inserted {
                    row.insert(field, value.clone());
                }
            }
            index + 1
        }
    };
    rows.splice(index..index, inserted);
    Ok(rows)
}

/// Moves one item so that it ends up at `to`.
///
/// Within a section the item takes the target's place and the rows in
/// between shift by one. Across sections it is inserted before the target and
/// takes the target section's value.
pub fn move_row(
    snapshot: &Snapshot,
    from: IndexPath,
    to: IndexPath,
    section_field: Option<&str>,
    across_sections: bool,
) -> Result<Vec<Row>, ReconcileError> {
    let crosses = from.section != to.section;
    if crosses && !across_sections {
        return Err(ReconcileError::CrossSectionMove {
            from: from.section,
            to: to.section,
        });
    }

    let from_index = source_index(snapshot, from)?;
    let to_index = insertion_index(snapshot, to)?;
    let target_section = section_value(snapshot, to.section);

    let mut rows = snapshot.source_rows().to_vec();
    let mut row = rows.remove(from_index);
    if let (Some(field), true) = (section_field, crosses) {
        row.insert(field, target_section);
    }

    let at = if crosses && to_index > from_index { to_index - 1 } else { to_index };
    let at = at.min(rows.len());
    rows.insert(at, row);
    Ok(rows)
}

/// Moves several items, keeping their relative raw order, in front of the
/// item currently at `to` (or to the end of its section).
pub fn move_rows(
    snapshot: &Snapshot,
    from: &[IndexPath],
    to: IndexPath,
    section_field: Option<&str>,
    across_sections: bool,
) -> Result<Vec<Row>, ReconcileError> {
    let crosses = from.iter().find(|ip| ip.section != to.section);
    if let Some(origin) = crosses {
        if !across_sections {
            return Err(ReconcileError::CrossSectionMove {
                from: origin.section,
                to: to.section,
            });
        }
    }

    let mut moved: Vec<usize> = from
        .iter()
        .map(|ip| source_index(snapshot, *ip))
        .collect::<Result<_, _>>()?;
    moved.sort_unstable();
    moved.dedup();
    let target = insertion_index(snapshot, to)?;

    let target_section = section_value(snapshot, to.section);
    let mut rows = snapshot.source_rows().to_vec();
    let mut carried = Vec::with_capacity(moved.len());
    for &index in moved.iter().rev() {
        carried.push(rows.remove(index));
    }
    carried.reverse();

    if let (Some(field), Some(_)) = (section_field, crosses) {
        for row in &mut carried {
            row.insert(field, target_section.clone());
        }
    }

    let shift = moved.iter().filter(|&&index| index < target).count();
    let at = (target - shift).min(rows.len());
    rows.splice(at..at, carried);
    Ok(rows)
}

/// Removes the items at the given index paths.
pub fn remove_rows(snapshot: &Snapshot, paths: &[IndexPath]) -> Result<Vec<Row>, ReconcileError> {
    let mut removed: Vec<usize> = paths
        .iter()
        .map(|ip| source_index(snapshot, *ip))
        .collect::<Result<_, _>>()?;
    removed.sort_unstable();
    removed.dedup();

    let mut rows = snapshot.source_rows().to_vec();
    for index in removed.into_iter().rev() {
        rows.remove(index);
    }
    Ok(rows)
}

/// Removes the item identified by `key`.
pub fn delete_row(snapshot: &Snapshot, key: &RowKey) -> Result<Vec<Row>, ReconcileError> {
    let index = snapshot
        .position(key)
        .map(|p| p.source_index)
        .ok_or_else(|| ReconcileError::UnknownKey(key.clone()))?;
    let mut rows = snapshot.source_rows().to_vec();
    rows.remove(index);
    Ok(rows)
}

/// Builds a new row from the data shape defaults with a fresh identity.
///
/// Numeric identity fields get one more than the largest existing value;
/// any other identity gets a random UUID.
pub fn default_row(shape: &DataShape, uid_field: &str, existing: &[Row]) -> Row {
    let mut row = Row::new();
    for field in shape.fields() {
        if let Some(value) = &field.default_value {
            row.insert(field.name.clone(), value.clone());
        }
    }

    let numeric = shape.field(uid_field).is_some_and(|f| f.base_type.is_numeric());
    let uid = if numeric {
        let max = existing
            .iter()
            .filter_map(|r| match r.get(uid_field) {
                Some(Value::Int(n)) => Some(*n),
                Some(Value::Float(n)) => Some(n.floor() as i64),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        Value::Int(max + 1)
    } else {
        Value::String(Uuid::new_v4().to_string())
    };
    row.insert(uid_field, uid);
    row
}

/// Inserts a default row, returning the new rows and the new row's identity.
pub fn insert_new_row(
    snapshot: &Snapshot,
    shape: &DataShape,
    uid_field: &str,
    position: InsertPosition,
) -> Result<(Vec<Row>, RowKey), ReconcileError> {
    let mut rows = snapshot.source_rows().to_vec();
    let row = default_row(shape, uid_field, &rows);
    let key = row
        .key(uid_field)
        .map_err(|_| ReconcileError::missing_uid(rows.len(), uid_field))?;

    let index = match position {
        InsertPosition::Beginning => 0,
        InsertPosition::End => rows.len(),
        InsertPosition::Index(index) => index.min(rows.len()),
    };
    rows.insert(index, row);
    Ok((rows, key))
}
