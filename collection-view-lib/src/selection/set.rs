//! Selection set with mode rules

use std::collections::HashSet;
use std::hash::Hash;

use serde::Deserialize;
use serde::Serialize;

/// How many items may be selected by user interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Interaction never selects.
    #[default]
    None,
    /// Selecting an item deselects every other one.
    Single,
    /// Items are selected and deselected independently.
    Multi,
}

/// Tracks selected items by their keys.
///
/// Mode rules apply to interactive changes ([`select`](Self::select),
/// [`toggle`](Self::toggle)). Programmatic changes ([`force`](Self::force),
/// [`replace`](Self::replace)) bypass them.
#[derive(Debug, Clone)]
pub struct Selection<K: Clone + Eq + Hash> {
    pub mode: SelectionMode,
    selected: HashSet<K>,
}

impl<K: Clone + Eq + Hash> Default for Selection<K> {
    fn default() -> Self {
        Self::new(SelectionMode::None)
    }
}

impl<K: Clone + Eq + Hash> Selection<K> {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selected: HashSet::new(),
        }
    }

    /// Selects a key. Returns true if selection changed.
    pub fn select(&mut self, key: K) -> bool {
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Single => {
                if self.selected.len() == 1 && self.selected.contains(&key) {
                    return false;
                }
                self.selected.clear();
                self.selected.insert(key);
                true
            }
            SelectionMode::Multi => self.selected.insert(key),
        }
    }

    /// Deselects a key. Returns true if selection changed.
    pub fn deselect(&mut self, key: &K) -> bool {
        self.selected.remove(key)
    }

    /// Toggle selection for a key. Returns true if selection changed.
    pub fn toggle(&mut self, key: K) -> bool {
        if self.selected.contains(&key) {
            self.deselect(&key)
        } else {
            self.select(key)
        }
    }

    /// Selects a key regardless of mode.
    pub fn force(&mut self, key: K) -> bool {
        self.selected.insert(key)
    }

    /// Replaces the whole selection regardless of mode.
    pub fn replace(&mut self, keys: impl IntoIterator<Item = K>) -> bool {
        let next: HashSet<K> = keys.into_iter().collect();
        if next == self.selected {
            return false;
        }
        self.selected = next;
        true
    }

    /// Keeps only the keys for which `keep` returns true. Returns true if any
    /// key was dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) -> bool {
        let before = self.selected.len();
        self.selected.retain(|k| keep(k));
        self.selected.len() != before
    }

    pub fn is_selected(&self, key: &K) -> bool {
        self.selected.contains(key)
    }

    /// Clear all selections. Returns true if anything was selected.
    pub fn clear(&mut self) -> bool {
        let changed = !self.selected.is_empty();
        self.selected.clear();
        changed
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Get all selected keys.
    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.selected.iter()
    }
}
