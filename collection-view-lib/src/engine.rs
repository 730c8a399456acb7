//! Virtualization engine contracts

use async_trait::async_trait;

use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;

/// Read access to the reconciled data, as consumed by the engine.
pub trait DataSet: Send + Sync {
    fn number_of_sections(&self) -> usize;

    fn number_of_rows(&self, section: usize) -> usize;

    fn index_path_for(&self, key: &RowKey) -> Option<IndexPath>;

    fn row_at(&self, index_path: IndexPath) -> Option<Row>;

    /// Stable identity of the item at `index_path`, used to match items
    /// across an animated transition.
    fn identifier_for(&self, index_path: IndexPath) -> Option<RowKey>;

    /// Switches reads to the previous data set during a transition.
    fn use_old_data(&self, use_old: bool);

    fn is_using_old_data(&self) -> bool;
}

/// Parameters of a data transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous_count: usize,
    pub count: usize,
    pub animated: bool,
}

/// The layout engine that decides which index paths are visible.
#[async_trait]
pub trait VirtualizationEngine: Send + Sync {
    /// Installs a data set without animation.
    fn install(&self, data: &dyn DataSet);

    /// Recomputes layout for new data, resolving when the transition ends.
    ///
    /// The engine may call [`DataSet::use_old_data`] to read the previous data
    /// while computing the animation.
    async fn transition(&self, data: &dyn DataSet, transition: Transition);

    /// Resolves when no interactive (drag) movement is in progress.
    async fn interactive_movement_finished(&self) {}

    /// Drops any dragging state that refers to stale index paths.
    fn invalidate_dragging_index_paths(&self) {}
}
