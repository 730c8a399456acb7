//! Recyclable cell state machine

use std::fmt;
use std::sync::Arc;

use log::debug;
use log::warn;

use super::GlobalParameters;
use super::TemplateInstance;
use crate::config::ParameterBindings;
use crate::config::ROW_BINDING;
use crate::host::Fade;
use crate::host::TemplateRuntime;
use crate::model::DataShape;
use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;
use crate::model::Value;
use crate::template::FetchResult;
use crate::template::PendingFetch;
use crate::template::TemplateCache;
use crate::template::TemplateDefinition;
use crate::template::TemplateLookup;

/// Pool-unique cell identifier. Ordering follows creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub(crate) u64);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle phase of a cell's template content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    /// No template name assigned.
    Unbound,
    /// A template is assigned but not built yet: the cell is not retained or
    /// the definition is not available.
    Deferred,
    /// The instance is being built.
    Rendering,
    Live,
    /// Live, with the previous instance still fading out.
    Retiring,
    Destroyed,
}

/// Kind of supplementary view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupplementaryKind {
    Header,
    Footer,
    /// Shown in place of the items when the data set is empty.
    Empty,
}

/// What a cell currently displays.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    None,
    Item {
        index_path: IndexPath,
        key: RowKey,
        row: Row,
    },
    Supplementary {
        kind: SupplementaryKind,
        section: usize,
        /// Parameter receiving the section identifier.
        parameter: Option<String>,
        identifier: Value,
    },
}

/// A change to a row, requested by a template writing one of its bound
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RowEdit {
    pub key: RowKey,
    /// Changed fields only.
    pub patch: Row,
}

/// Result of a template writing one of its own parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateWrite {
    /// Nothing to publish: reserved parameter, unbound parameter, unchanged
    /// value, or the cell is not retained.
    Ignored,
    /// A global parameter changed.
    Global,
    /// A bound row field changed.
    Row(RowEdit),
}

/// Settings shared by every cell of a view.
pub struct CellContext {
    pub runtime: Arc<dyn TemplateRuntime>,
    pub cache: TemplateCache,
    pub bindings: ParameterBindings,
    pub data_shape: Option<DataShape>,
    pub selected_parameter: Option<String>,
    pub editing_parameter: Option<String>,
    pub globals: GlobalParameters,
}

impl CellContext {
    fn is_reserved(&self, name: &str) -> bool {
        self.selected_parameter.as_deref() == Some(name) || self.editing_parameter.as_deref() == Some(name)
    }
}

/// A pooled view object owning at most one active template instance.
///
/// The cell decides when its instance is built, patched, swapped and torn
/// down. Building only happens while the cell is retained by the engine;
/// otherwise the work is deferred until [`prepare_for_display`](Self::prepare_for_display).
pub struct Cell {
    id: CellId,
    context: Arc<CellContext>,
    phase: CellPhase,
    template: Option<String>,
    instance: Option<TemplateInstance>,
    retiring: Option<TemplateInstance>,
    deferred: Option<Arc<TemplateDefinition>>,
    content: CellContent,
    selected: bool,
    editing: bool,
    retained: bool,
}

impl Cell {
    pub(crate) fn new(id: CellId, context: Arc<CellContext>) -> Self {
        Self {
            id,
            context,
            phase: CellPhase::Unbound,
            template: None,
            instance: None,
            retiring: None,
            deferred: None,
            content: CellContent::None,
            selected: false,
            editing: false,
            retained: false,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn phase(&self) -> CellPhase {
        self.phase
    }

    /// Current template name, which is also the reuse identifier.
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref()
    }

    pub fn instance(&self) -> Option<&TemplateInstance> {
        self.instance.as_ref()
    }

    pub fn retiring(&self) -> Option<&TemplateInstance> {
        self.retiring.as_ref()
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn index_path(&self) -> Option<IndexPath> {
        match &self.content {
            CellContent::Item { index_path, .. } => Some(*index_path),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&RowKey> {
        match &self.content {
            CellContent::Item { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn row(&self) -> Option<&Row> {
        match &self.content {
            CellContent::Item { row, .. } => Some(row),
            _ => None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_retained(&self) -> bool {
        self.retained
    }

    /// Returns `true` if a definition is waiting for the cell to be retained.
    pub fn has_deferred_render(&self) -> bool {
        self.deferred.is_some()
    }

    // =========================================================================
    // Template lifecycle
    // =========================================================================

    /// Points the cell at a template.
    ///
    /// Empty names and the current name are ignored. Returns the pending
    /// fetch when the definition is not cached yet; the owner delivers its
    /// result with [`deliver`](Self::deliver).
    pub fn assign_template(&mut self, name: &str, animated: bool) -> Option<PendingFetch> {
        if name.is_empty() || self.phase == CellPhase::Destroyed || self.template.as_deref() == Some(name) {
            return None;
        }

        debug!("Cell {} template {:?} -> '{}'", self.id, self.template, name);
        self.template = Some(name.to_string());
        self.deferred = None;

        match self.context.cache.get(name) {
            TemplateLookup::Ready(definition) => {
                self.offer(definition, animated);
                None
            }
            TemplateLookup::Pending(fetch) => {
                if self.instance.is_none() {
                    self.phase = CellPhase::Deferred;
                }
                Some(fetch)
            }
        }
    }

    /// Hands a settled fetch to the cell. Results for a template the cell no
    /// longer wants are dropped; failures leave the cell deferred.
    pub fn deliver(&mut self, name: &str, result: FetchResult, animated: bool) {
        if self.phase == CellPhase::Destroyed || self.template.as_deref() != Some(name) {
            debug!("Cell {} ignoring stale template '{}'", self.id, name);
            return;
        }
        if self.instance.as_ref().is_some_and(|i| i.template() == name) {
            return;
        }
        match result {
            Ok(definition) => self.offer(definition, animated),
            Err(e) => warn!("Cell {} stays blank: {}", self.id, e),
        }
    }

    fn offer(&mut self, definition: Arc<TemplateDefinition>, animated: bool) {
        if !self.retained {
            self.deferred = Some(definition);
            if self.instance.is_none() {
                self.phase = CellPhase::Deferred;
            }
            return;
        }
        self.render(&definition, animated);
    }

    fn render(&mut self, definition: &TemplateDefinition, animated: bool) {
        let restore = if self.instance.is_some() { CellPhase::Live } else { CellPhase::Deferred };
        self.phase = CellPhase::Rendering;

        let mut instance = match TemplateInstance::build(&*self.context.runtime, definition) {
            Ok(instance) => instance,
            Err(e) => {
                warn!("Cell {}: {}", self.id, e);
                self.phase = restore;
                return;
            }
        };

        for (name, value) in self.parameters() {
            instance.set_parameter(&name, value);
        }
        for (name, value) in self.context.globals.entries() {
            instance.set_parameter(&name, value);
        }
        if let Some(name) = &self.context.editing_parameter {
            instance.set_parameter(name, Value::Bool(self.editing));
        }
        if let Some(name) = &self.context.selected_parameter {
            instance.set_parameter(name, Value::Bool(self.selected));
        }
        instance.fire_loaded();

        if let Some(mut previous) = self.instance.take() {
            if let Some(mut stale) = self.retiring.take() {
                stale.destroy();
            }
            if animated {
                previous.begin_fade(Fade::Out);
                instance.begin_fade(Fade::In);
                self.retiring = Some(previous);
            } else {
                previous.destroy();
            }
        }

        debug!("Cell {} rendered template '{}'", self.id, definition.name);
        self.instance = Some(instance);
        self.phase = if self.retiring.is_some() { CellPhase::Retiring } else { CellPhase::Live };
    }

    /// Marks the cell as retained by the engine and builds deferred content.
    pub fn prepare_for_display(&mut self) {
        self.retained = true;
        if let Some(definition) = self.deferred.take() {
            self.render(&definition, false);
        }
    }

    /// Called when the cell enters the reuse queue.
    pub fn prepare_for_reuse(&mut self) {
        self.finish_transition();
        self.retained = false;
    }

    /// Ends a cross-fade, destroying the outgoing instance.
    pub fn finish_transition(&mut self) {
        if let Some(mut retiring) = self.retiring.take() {
            retiring.destroy();
        }
        if self.phase == CellPhase::Retiring {
            self.phase = CellPhase::Live;
        }
    }

    pub fn bounds_changed(&mut self) {
        if let Some(instance) = self.instance.as_mut() {
            instance.layout_changed();
        }
    }

    pub fn destroy(&mut self) {
        self.finish_transition();
        if let Some(mut instance) = self.instance.take() {
            instance.destroy();
        }
        self.deferred = None;
        self.retained = false;
        self.phase = CellPhase::Destroyed;
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Binds the cell to an item and pushes the changed parameters.
    pub fn bind_item(&mut self, index_path: IndexPath, key: RowKey, row: Row) {
        self.content = CellContent::Item { index_path, key, row };
        self.push_parameters();
    }

    /// Binds the cell to a section header, footer or empty-state view.
    pub fn bind_supplementary(
        &mut self,
        kind: SupplementaryKind,
        section: usize,
        parameter: Option<String>,
        identifier: Value,
    ) {
        self.content = CellContent::Supplementary {
            kind,
            section,
            parameter,
            identifier,
        };
        self.push_parameters();
    }

    /// Parameter values the current content supplies.
    pub fn parameters(&self) -> Vec<(String, Value)> {
        match &self.content {
            CellContent::Item { row, .. } => self.context.bindings.parameters_for(row, self.context.data_shape.as_ref()),
            CellContent::Supplementary {
                parameter: Some(parameter),
                identifier,
                ..
            } => vec![(parameter.clone(), identifier.clone())],
            _ => Vec::new(),
        }
    }

    fn push_parameters(&mut self) {
        let parameters = self.parameters();
        if let Some(instance) = self.instance.as_mut() {
            for (name, value) in parameters {
                instance.set_parameter(&name, value);
            }
        }
    }

    pub fn set_selected(&mut self, selected: bool) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        if let (Some(instance), Some(name)) = (self.instance.as_mut(), &self.context.selected_parameter) {
            instance.set_parameter(name, Value::Bool(selected));
        }
    }

    pub fn set_editing(&mut self, editing: bool) {
        if self.editing == editing {
            return;
        }
        self.editing = editing;
        if let (Some(instance), Some(name)) = (self.instance.as_mut(), &self.context.editing_parameter) {
            instance.set_parameter(name, Value::Bool(editing));
        }
    }

    /// Pushes a global parameter value.
    pub fn set_global(&mut self, name: &str, value: Value) {
        if let Some(instance) = self.instance.as_mut() {
            instance.set_parameter(name, value);
        }
    }

    /// Handles a template writing one of its own parameters.
    ///
    /// The cell's row copy is patched immediately; the returned edit is what
    /// the owner must publish back to the data set.
    pub fn template_wrote(&mut self, name: &str, value: Value) -> TemplateWrite {
        if !self.retained || self.context.is_reserved(name) {
            return TemplateWrite::Ignored;
        }
        if let Some(instance) = self.instance.as_mut() {
            instance.record_parameter(name, value.clone());
        }
        if self.context.globals.contains(name) {
            self.context.globals.set(name, value);
            return TemplateWrite::Global;
        }

        let CellContent::Item { key, row, .. } = &mut self.content else {
            return TemplateWrite::Ignored;
        };

        let mut patch = Row::new();
        for field in self.context.bindings.fields_for(name) {
            if field == ROW_BINDING {
                if let Some(source) = value.as_table().and_then(|t| t.first_row()) {
                    for (f, v) in source.fields() {
                        if row.get(f) != Some(v) {
                            patch.insert(f.clone(), v.clone());
                        }
                    }
                }
            } else if row.get(field) != Some(&value) {
                patch.insert(field, value.clone());
            }
        }

        if patch.is_empty() {
            return TemplateWrite::Ignored;
        }
        row.merge(&patch);
        TemplateWrite::Row(RowEdit {
            key: key.clone(),
            patch,
        })
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("template", &self.template)
            .field("content", &self.content)
            .field("selected", &self.selected)
            .field("editing", &self.editing)
            .field("retained", &self.retained)
            .finish()
    }
}
