//! Selection and editing state that survives data updates

use log::debug;

use super::Selection;
use super::SelectionMode;
use crate::model::IndexPath;
use crate::model::RowKey;
use crate::pipeline::Snapshot;

/// An item being edited, with the index path it was last seen at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditingEntry {
    pub key: RowKey,
    pub index_path: IndexPath,
}

/// Entries dropped by [`SelectionTracker::reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub selection_dropped: bool,
    pub editing_dropped: usize,
}

/// Values to publish to the host after a selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionFlags {
    /// New `HasSelectedCells` value, only when it changed since the last
    /// publication.
    pub has_selection: Option<bool>,
    pub count: usize,
}

/// Selection and editing state held as row identities.
///
/// State is independent of which cells currently exist. It is expressed as
/// index paths for the engine and as raw data indices for the host, both
/// derived from the committed snapshot.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    selection: Selection<RowKey>,
    editing: Vec<EditingEntry>,
    published_has_selection: Option<bool>,
    saved_mode: Option<SelectionMode>,
}

impl SelectionTracker {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            selection: Selection::new(mode),
            ..Self::default()
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.selection.mode
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.selection.mode = mode;
    }

    /// Switches to multiple selection until
    /// [`finish_selection_mode`](Self::finish_selection_mode).
    pub fn begin_selection_mode(&mut self) -> bool {
        if self.saved_mode.is_some() {
            return false;
        }
        self.saved_mode = Some(self.selection.mode);
        self.selection.mode = SelectionMode::Multi;
        true
    }

    /// Restores the previous mode and clears the selection. Returns true if
    /// the selection changed.
    pub fn finish_selection_mode(&mut self) -> bool {
        match self.saved_mode.take() {
            Some(mode) => {
                self.selection.mode = mode;
                self.selection.clear()
            }
            None => false,
        }
    }

    pub fn is_in_selection_mode(&self) -> bool {
        self.saved_mode.is_some()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn is_selected(&self, key: &RowKey) -> bool {
        self.selection.is_selected(key)
    }

    pub fn select(&mut self, key: RowKey) -> bool {
        self.selection.select(key)
    }

    pub fn deselect(&mut self, key: &RowKey) -> bool {
        self.selection.deselect(key)
    }

    pub fn toggle(&mut self, key: RowKey) -> bool {
        self.selection.toggle(key)
    }

    pub fn deselect_all(&mut self) -> bool {
        self.selection.clear()
    }

    /// Selects every item in multiple selection mode, or the first item in
    /// single selection mode.
    pub fn select_all(&mut self, snapshot: &Snapshot) -> bool {
        match self.selection.mode {
            SelectionMode::None => false,
            SelectionMode::Single => match snapshot.first_key() {
                Some(key) => self.selection.select(key.clone()),
                None => false,
            },
            SelectionMode::Multi => self.selection.replace(snapshot.ordered().map(|(key, _)| key.clone())),
        }
    }

    /// Selects the first item if nothing is selected and data exists.
    /// Ignores the selection mode.
    pub fn select_first(&mut self, snapshot: &Snapshot) -> bool {
        if !self.selection.is_empty() {
            return false;
        }
        match snapshot.first_key() {
            Some(key) => self.selection.force(key.clone()),
            None => false,
        }
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_empty()
    }

    /// Selected keys in a stable order.
    pub fn selected_keys(&self) -> Vec<RowKey> {
        let mut keys: Vec<RowKey> = self.selection.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Selected index paths in the given snapshot, in visual order.
    pub fn selected_index_paths(&self, snapshot: &Snapshot) -> Vec<IndexPath> {
        let mut paths: Vec<IndexPath> = self
            .selection
            .iter()
            .filter_map(|key| snapshot.index_path_for(key))
            .collect();
        paths.sort();
        paths
    }

    /// Raw data indices of the selected items, ascending.
    pub fn published_indices(&self, snapshot: &Snapshot) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .selection
            .iter()
            .filter_map(|key| snapshot.position(key).map(|p| p.source_index))
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Replaces the selection with the items at the given raw data indices.
    /// Indices outside the data set are ignored.
    pub fn apply_published(&mut self, indices: &[usize], snapshot: &Snapshot) -> bool {
        let keys: Vec<RowKey> = indices
            .iter()
            .filter_map(|&index| snapshot.key_for_source(index).cloned())
            .collect();
        self.selection.replace(keys)
    }

    /// Returns the values to publish, remembering `HasSelectedCells`.
    pub fn publication_flags(&mut self) -> SelectionFlags {
        let has = self.has_selection();
        let changed = self.published_has_selection != Some(has);
        self.published_has_selection = Some(has);
        SelectionFlags {
            has_selection: changed.then_some(has),
            count: self.len(),
        }
    }

    // =========================================================================
    // Editing
    // =========================================================================

    pub fn is_editing(&self, key: &RowKey) -> bool {
        self.editing.iter().any(|e| &e.key == key)
    }

    pub fn begin_editing(&mut self, key: RowKey, index_path: IndexPath) -> bool {
        if self.is_editing(&key) {
            return false;
        }
        self.editing.push(EditingEntry { key, index_path });
        true
    }

    pub fn finish_editing(&mut self, key: &RowKey) -> bool {
        let before = self.editing.len();
        self.editing.retain(|e| &e.key != key);
        self.editing.len() != before
    }

    pub fn editing(&self) -> &[EditingEntry] {
        &self.editing
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Drops identities missing from `snapshot` and re-resolves the index
    /// paths of edited items.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> ReconcileSummary {
        let selection_dropped = self.selection.retain(|key| snapshot.contains(key));

        let before = self.editing.len();
        self.editing.retain_mut(|entry| match snapshot.index_path_for(&entry.key) {
            Some(index_path) => {
                entry.index_path = index_path;
                true
            }
            None => {
                debug!("Dropping editing entry for vanished row '{}'", entry.key);
                false
            }
        });

        ReconcileSummary {
            selection_dropped,
            editing_dropped: before - self.editing.len(),
        }
    }
}
