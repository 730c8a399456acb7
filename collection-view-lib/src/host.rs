//! Host environment contracts
//!
//! The collection view never renders anything itself. Templates are built by
//! a [`TemplateRuntime`], and values flow in and out through a
//! [`HostSurface`].

use crate::error::ConfigError;
use crate::error::PublishError;
use crate::model::Value;
use crate::template::TemplateDefinition;

/// Property and event names exchanged with the host.
pub mod names {
    pub const DATA: &str = "Data";
    pub const HAS_SELECTED_CELLS: &str = "HasSelectedCells";
    pub const SELECTED_CELLS_COUNT: &str = "SelectedCellsCount";
    pub const SORT_FIELD: &str = "SortField";
    pub const SORT_ASCENDING: &str = "SortAscending";

    /// Prefix of the properties populated from the triggering row before an
    /// event fires.
    pub const EVENT_FIELD_PREFIX: &str = "Event:";

    pub const CELL_CLICKED: &str = "CellWasClicked";
    pub const CELL_DOUBLE_CLICKED: &str = "CellWasDoubleClicked";
    pub const CELL_LONG_CLICKED: &str = "CellWasLongClicked";
    pub const CELL_RIGHT_CLICKED: &str = "CellWasRightClicked";
    pub const INTERACTIVE_MOVE_BEGAN: &str = "CollectionViewDidBeginInteractiveMovement";
    pub const INTERACTIVE_MOVE_FINISHED: &str = "CollectionViewDidFinishInteractiveMovement";
    pub const ITEMS_MOVED: &str = "CollectionViewDidMoveItems";
    pub const ITEMS_REMOVED: &str = "CollectionViewDidRemoveItems";
    pub const ITEMS_ACCEPTED: &str = "CollectionViewDidAcceptDroppedItems";
}

/// The component the view is embedded in.
///
/// Implementations must tolerate re-entrant calls: setting `Data` may cause
/// the host to schedule another data update.
pub trait HostSurface: Send + Sync {
    /// Returns the current value of a property.
    fn property(&self, name: &str) -> Option<Value>;

    /// Writes a property.
    fn set_property(&self, name: &str, value: Value) -> Result<(), PublishError>;

    /// Fires a named event.
    fn fire_event(&self, name: &str);

    /// Publishes the selected raw data indices of `property` to other
    /// components.
    fn publish_selection(&self, property: &str, indices: &[usize]) -> Result<(), PublishError>;
}

/// Builds live template instances from definitions.
pub trait TemplateRuntime: Send + Sync {
    fn instantiate(&self, definition: &TemplateDefinition) -> Result<Box<dyn TemplateHandle>, ConfigError>;
}

/// Role of an instance during an animated template swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fade {
    In,
    Out,
}

/// A live template instance owned by a cell.
///
/// Parameter writes made here never echo back to the cell; changes made by
/// the template itself are reported through
/// [`CollectionView::template_parameter_changed`](crate::CollectionView::template_parameter_changed).
pub trait TemplateHandle: Send {
    fn set_parameter(&mut self, name: &str, value: &Value);

    /// Signals that every initial parameter has been applied.
    fn fire_loaded(&mut self);

    /// Re-runs responsive layout after the cell's bounds changed.
    fn layout_changed(&mut self) {}

    /// Starts a cross-fade animation.
    fn begin_fade(&mut self, _fade: Fade) {}

    fn destroy(&mut self);
}
