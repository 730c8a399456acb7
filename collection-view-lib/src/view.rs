//! The collection view coordinator

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;

use futures::future::join_all;
use log::debug;
use log::warn;

use crate::cell::Cell;
use crate::cell::CellContext;
use crate::cell::CellId;
use crate::cell::CellPool;
use crate::cell::GlobalParameters;
use crate::cell::SupplementaryKind;
use crate::cell::TemplateWrite;
use crate::config::CollectionConfig;
use crate::config::DropPolicy;
use crate::engine::DataSet;
use crate::engine::VirtualizationEngine;
use crate::error::ConfigError;
use crate::error::Error;
use crate::error::ReconcileError;
use crate::host::HostSurface;
use crate::host::TemplateRuntime;
use crate::host::names;
use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;
use crate::model::RowTable;
use crate::model::Value;
use crate::pipeline::CommitHooks;
use crate::pipeline::CommitReport;
use crate::pipeline::DataUpdate;
use crate::pipeline::Pipeline;
use crate::pipeline::ReconcileOptions;
use crate::pipeline::Snapshot;
use crate::pipeline::UpdateOutcome;
use crate::pipeline::edit;
use crate::pipeline::edit::InsertPosition;
use crate::selection::SelectionTracker;
use crate::template::Size;
use crate::template::TemplateCache;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Kind of pointer interaction on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Single,
    Double,
    Long,
    /// Secondary button; fires its event without touching the selection.
    Right,
}

/// A data-bound, virtualized collection of template-driven cells.
///
/// Wires the [`Pipeline`], the [`CellPool`] and the [`SelectionTracker`] to
/// the host and the virtualization engine. Cheap to clone (uses `Arc`
/// internally).
///
/// # Example
///
/// ```ignore
/// let view = CollectionView::builder(config)
///     .cache(cache)
///     .host(host)
///     .engine(engine)
///     .runtime(runtime)
///     .build()?;
///
/// view.start().await;
/// view.update_data(Some(rows)).await?;
/// let cell = view.cell_for_item(IndexPath::new(0, 0))?;
/// view.display_cell(cell);
/// ```
#[derive(Clone)]
pub struct CollectionView {
    inner: Arc<ViewInner>,
}

// Lock order: config, tracker, pool.
struct ViewInner {
    config: RwLock<CollectionConfig>,
    cache: TemplateCache,
    host: Arc<dyn HostSurface>,
    engine: Arc<dyn VirtualizationEngine>,
    pipeline: Pipeline,
    globals: GlobalParameters,
    tracker: Mutex<SelectionTracker>,
    pool: Mutex<CellPool>,
}

/// Selection values computed under the tracker lock, sent after releasing it.
struct SelectionPublication {
    has_selection: Option<bool>,
    count: usize,
    indices: Option<Vec<usize>>,
}

impl CollectionView {
    pub fn builder(config: CollectionConfig) -> CollectionViewBuilder {
        CollectionViewBuilder::new(config)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> CollectionConfig {
        self.inner.config()
    }

    /// The data set served to the engine.
    pub fn data_set(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    /// Returns the committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.pipeline.snapshot()
    }

    pub fn cache(&self) -> &TemplateCache {
        &self.inner.cache
    }

    pub fn globals(&self) -> &GlobalParameters {
        &self.inner.globals
    }

    /// Runs `f` against a cell, if it exists.
    pub fn with_cell<R>(&self, id: CellId, f: impl FnOnce(&Cell) -> R) -> Option<R> {
        lock(&self.inner.pool).get(id).map(f)
    }

    /// Returns the bound cell displaying `index_path`.
    pub fn cell_at(&self, index_path: IndexPath) -> Option<CellId> {
        lock(&self.inner.pool).cell_at(index_path)
    }

    // =========================================================================
    // Startup and data
    // =========================================================================

    /// Preloads every configured template, then lets data updates through.
    pub async fn start(&self) {
        let names = self.inner.config().template_names();
        for (name, e) in self.inner.cache.preload(&names).await {
            warn!("Preloading template '{}' failed: {}", name, e);
        }
        debug!("Collection view started with {} templates", names.len());
        self.inner.pipeline.open_render_gate();
    }

    /// Replaces the data set. `None` clears it.
    pub async fn update_data(&self, rows: Option<Vec<Row>>) -> Result<UpdateOutcome, Error> {
        self.update(DataUpdate {
            rows,
            force_layout: false,
        })
        .await
    }

    /// Runs a data update through the pipeline and waits for the templates
    /// it needs.
    pub async fn update(&self, update: DataUpdate) -> Result<UpdateOutcome, Error> {
        let ticket = self.inner.pipeline.reserve();
        let template_field = self.inner.config().cell_template_field.filter(|f| !f.is_empty());
        if let (Some(field), Some(rows)) = (template_field, update.rows.as_ref()) {
            let mut names: Vec<String> = Vec::new();
            for name in rows.iter().filter_map(|row| row.get(&field).and_then(Value::as_str)) {
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
            if !self.inner.pipeline.is_latest(&ticket) {
                return Ok(UpdateOutcome::Superseded);
            }
            for (name, e) in self.inner.cache.preload(&names).await {
                warn!("Template '{}' for incoming rows unavailable: {}", name, e);
            }
        }

        let outcome = self.inner.pipeline.update_reserved(ticket, update, &*self.inner).await?;
        self.settle().await;
        Ok(outcome)
    }

    /// Handles a property change coming from the host.
    pub async fn property_changed(&self, name: &str, value: Value) -> Result<(), Error> {
        match name {
            names::DATA => {
                let rows = value.as_table().map(|table| table.rows.clone());
                self.update_data(rows).await?;
            }
            names::SORT_FIELD => {
                let field = value.as_str().filter(|f| !f.is_empty()).map(str::to_string);
                let ascending = self.inner.config().sort_ascending;
                self.set_sort(field, ascending).await?;
            }
            names::SORT_ASCENDING => {
                let field = self.inner.config().sort_field;
                self.set_sort(field, value != Value::Bool(false)).await?;
            }
            _ if self.inner.globals.contains(name) => self.set_global(name, value),
            _ => debug!("Ignoring property '{}'", name),
        }
        Ok(())
    }

    /// Changes the sort order and re-reconciles the current rows.
    pub async fn set_sort(&self, field: Option<String>, ascending: bool) -> Result<UpdateOutcome, Error> {
        let options = {
            let mut config = self.inner.config.write().unwrap_or_else(PoisonError::into_inner);
            config.sort_field = field;
            config.sort_ascending = ascending;
            ReconcileOptions::from(&*config)
        };
        self.inner.pipeline.set_options(options);

        let rows = self.inner.pipeline.snapshot().source_rows().to_vec();
        self.update(DataUpdate::new(rows)).await
    }

    /// Waits for every template fetch cells are blocked on, then builds the
    /// cells that can render.
    pub async fn settle(&self) {
        loop {
            let loads = lock(&self.inner.pool).take_loads();
            if loads.is_empty() {
                break;
            }

            let results = join_all(loads.into_iter().map(|load| async move {
                let name = load.fetch.name().to_string();
                (load.cell, name, load.fetch.wait().await)
            }))
            .await;

            let animated = self.inner.pipeline.is_updating();
            let mut pool = lock(&self.inner.pool);
            for (cell, name, result) in results {
                pool.deliver(cell, &name, result, animated);
            }
        }
    }

    // =========================================================================
    // Cells
    // =========================================================================

    /// Returns a configured cell for the item at `index_path`.
    ///
    /// When no template can be resolved the cell stays blank.
    pub fn cell_for_item(&self, index_path: IndexPath) -> Result<CellId, Error> {
        let pipeline = &self.inner.pipeline;
        let row = pipeline
            .row_at(index_path)
            .ok_or(ReconcileError::IndexOutOfRange(index_path))?;
        let key = pipeline
            .identifier_for(index_path)
            .ok_or(ReconcileError::IndexOutOfRange(index_path))?;

        let config = self.inner.config.read().unwrap_or_else(PoisonError::into_inner);
        let (selected, editing) = {
            let tracker = lock(&self.inner.tracker);
            (tracker.is_selected(&key), tracker.is_editing(&key))
        };
        let name = config.template_for(&row, selected, editing).unwrap_or_else(|| {
            warn!("{}", ConfigError::NoTemplate(index_path));
            String::new()
        });
        drop(config);

        let mut pool = lock(&self.inner.pool);
        let id = pool.dequeue(&name);
        if let Some(cell) = pool.get_mut(id) {
            cell.set_selected(selected);
            cell.set_editing(editing);
            cell.bind_item(index_path, key, row);
        }
        pool.assign_template(id, &name, pipeline.is_updating());
        Ok(id)
    }

    /// Returns a header, footer or empty-state cell, if one is configured
    /// and applicable.
    pub fn supplementary_cell(&self, kind: SupplementaryKind, section: usize) -> Option<CellId> {
        let config = self.inner.config();
        let (template, parameter) = match kind {
            SupplementaryKind::Header => (config.header_template, config.header_section_parameter),
            SupplementaryKind::Footer => (config.footer_template, config.footer_section_parameter),
            SupplementaryKind::Empty => (config.empty_template, None),
        };
        let template = template.filter(|t| !t.is_empty())?;

        let snapshot = self.inner.pipeline.snapshot();
        let identifier = match kind {
            SupplementaryKind::Empty if snapshot.is_empty() => Value::Null,
            SupplementaryKind::Empty => return None,
            _ => snapshot.sections().get(section)?.identifier.clone().unwrap_or(Value::Null),
        };

        let mut pool = lock(&self.inner.pool);
        let id = pool.dequeue(&template);
        if let Some(cell) = pool.get_mut(id) {
            cell.bind_supplementary(kind, section, parameter, identifier);
        }
        pool.assign_template(id, &template, false);
        Some(id)
    }

    /// The engine is about to show the cell.
    pub fn display_cell(&self, id: CellId) {
        if let Some(cell) = lock(&self.inner.pool).get_mut(id) {
            cell.prepare_for_display();
        }
    }

    /// The engine no longer shows the cell and may reuse it.
    pub fn recycle_cell(&self, id: CellId) {
        lock(&self.inner.pool).recycle(id);
    }

    /// Destroys a cell for good.
    pub fn discard_cell(&self, id: CellId) {
        lock(&self.inner.pool).discard(id);
    }

    pub fn cell_bounds_changed(&self, id: CellId) {
        if let Some(cell) = lock(&self.inner.pool).get_mut(id) {
            cell.bounds_changed();
        }
    }

    /// The cross-fade animation of a cell ended.
    pub fn finish_cell_transition(&self, id: CellId) {
        if let Some(cell) = lock(&self.inner.pool).get_mut(id) {
            cell.finish_transition();
        }
    }

    /// Returns the size of an item: the width and height fields when
    /// configured, otherwise the template's intrinsic size.
    ///
    /// An uncached template is fetched synchronously, so this must not be
    /// called from inside an async task unless templates were preloaded.
    pub fn size_for_item(&self, index_path: IndexPath) -> Option<Size> {
        let row = self.inner.pipeline.row_at(index_path)?;
        let key = self.inner.pipeline.identifier_for(index_path)?;
        let config = self.inner.config();

        let field_size = |field: &Option<String>| field.as_deref().and_then(|f| row.get_float(f).ok().flatten());
        let width = field_size(&config.width_field);
        let height = field_size(&config.height_field);
        if let (Some(width), Some(height)) = (width, height) {
            return Some(Size::new(width, height));
        }

        let (selected, editing) = {
            let tracker = lock(&self.inner.tracker);
            (tracker.is_selected(&key), tracker.is_editing(&key))
        };
        let name = config.template_for(&row, selected, editing)?;
        let intrinsic = match self.inner.cache.get_blocking(&name) {
            Ok(definition) => definition.size(),
            Err(e) => {
                warn!("No size for {}: {}", index_path, e);
                None
            }
        };
        Some(Size::new(
            width.or(intrinsic.map(|s| s.width))?,
            height.or(intrinsic.map(|s| s.height))?,
        ))
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn select_item(&self, index_path: IndexPath) -> bool {
        self.change_selection(true, |tracker, snapshot| match snapshot.key_at(index_path) {
            Some(key) => tracker.select(key.clone()),
            None => false,
        })
    }

    pub fn deselect_item(&self, index_path: IndexPath) -> bool {
        self.change_selection(true, |tracker, snapshot| match snapshot.key_at(index_path) {
            Some(key) => tracker.deselect(key),
            None => false,
        })
    }

    pub fn toggle_item(&self, index_path: IndexPath) -> bool {
        self.change_selection(true, |tracker, snapshot| match snapshot.key_at(index_path) {
            Some(key) => tracker.toggle(key.clone()),
            None => false,
        })
    }

    pub fn deselect_all(&self) -> bool {
        self.change_selection(true, |tracker, _| tracker.deselect_all())
    }

    pub fn select_all(&self) -> bool {
        self.change_selection(true, |tracker, snapshot| tracker.select_all(snapshot))
    }

    /// Enters multiple selection mode.
    pub fn begin_selection_mode(&self) -> bool {
        lock(&self.inner.tracker).begin_selection_mode()
    }

    /// Leaves multiple selection mode, clearing the selection.
    pub fn finish_selection_mode(&self) -> bool {
        self.change_selection(true, |tracker, _| tracker.finish_selection_mode())
    }

    /// Applies a selection published by another component.
    ///
    /// Selections originating from this view are ignored, and the result is
    /// not published back.
    pub fn apply_external_selection(&self, source: &str, indices: &[usize]) -> bool {
        if self.inner.config().component_id.as_deref() == Some(source) {
            return false;
        }
        self.change_selection(false, |tracker, snapshot| tracker.apply_published(indices, snapshot))
    }

    pub fn selected_keys(&self) -> Vec<RowKey> {
        lock(&self.inner.tracker).selected_keys()
    }

    pub fn selected_index_paths(&self) -> Vec<IndexPath> {
        let snapshot = self.inner.pipeline.snapshot();
        lock(&self.inner.tracker).selected_index_paths(&snapshot)
    }

    fn change_selection(
        &self,
        broadcast: bool,
        change: impl FnOnce(&mut SelectionTracker, &Snapshot) -> bool,
    ) -> bool {
        let snapshot = self.inner.pipeline.snapshot();
        let publication = {
            let mut tracker = lock(&self.inner.tracker);
            if !change(&mut tracker, snapshot.as_ref()) {
                return false;
            }
            ViewInner::selection_publication(&mut tracker, &snapshot, broadcast)
        };
        self.inner.send_selection(publication);
        self.inner.refresh_cells(&snapshot, false);
        true
    }

    /// Handles a click on an item: updates the selection according to the
    /// selection mode, then fires the matching event.
    pub fn item_clicked(&self, index_path: IndexPath, click: Click) {
        let event = match click {
            Click::Single => {
                self.toggle_item(index_path);
                names::CELL_CLICKED
            }
            Click::Double => names::CELL_DOUBLE_CLICKED,
            Click::Long => names::CELL_LONG_CLICKED,
            Click::Right => names::CELL_RIGHT_CLICKED,
        };
        self.fire_event(event, Some(index_path));
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Starts editing the item at `index_path` and switches its cell to the
    /// editing template.
    pub fn begin_editing(&self, index_path: IndexPath) -> Result<bool, Error> {
        let snapshot = self.inner.pipeline.snapshot();
        let key = snapshot
            .key_at(index_path)
            .cloned()
            .ok_or(ReconcileError::IndexOutOfRange(index_path))?;

        let changed = {
            let mut tracker = lock(&self.inner.tracker);
            let changed = tracker.begin_editing(key.clone(), index_path);
            if changed {
                let mut pool = lock(&self.inner.pool);
                if let Some(id) = pool.cell_for_key(&key) {
                    if let Some(cell) = pool.get_mut(id) {
                        cell.prepare_for_display();
                    }
                }
            }
            changed
        };
        if changed {
            self.inner.refresh_cells(&snapshot, false);
        }
        Ok(changed)
    }

    pub fn finish_editing(&self, index_path: IndexPath) -> Result<bool, Error> {
        let snapshot = self.inner.pipeline.snapshot();
        let key = snapshot
            .key_at(index_path)
            .cloned()
            .ok_or(ReconcileError::IndexOutOfRange(index_path))?;

        let changed = lock(&self.inner.tracker).finish_editing(&key);
        if changed {
            self.inner.refresh_cells(&snapshot, false);
        }
        Ok(changed)
    }

    pub fn editing_index_paths(&self) -> Vec<IndexPath> {
        lock(&self.inner.tracker).editing().iter().map(|e| e.index_path).collect()
    }

    // =========================================================================
    // Parameters and events
    // =========================================================================

    /// Sets a global parameter and pushes it to every visible cell.
    pub fn set_global(&self, name: &str, value: Value) {
        self.inner.globals.set(name, value.clone());
        lock(&self.inner.pool).broadcast_global(name, &value);
    }

    /// Populates the `Event:<field>` properties from the item at
    /// `index_path`, then fires `event`.
    pub fn fire_event(&self, event: &str, index_path: Option<IndexPath>) {
        if let Some(row) = index_path.and_then(|ip| self.inner.pipeline.row_at(ip)) {
            for field in self.inner.config().event_fields {
                let property = format!("{}{}", names::EVENT_FIELD_PREFIX, field);
                self.inner.publish(&property, row.value(&field));
            }
        }
        self.inner.host.fire_event(event);
    }

    pub fn interactive_movement_began(&self, index_path: IndexPath) {
        self.fire_event(names::INTERACTIVE_MOVE_BEGAN, Some(index_path));
    }

    pub fn interactive_movement_finished(&self, index_path: IndexPath) {
        self.fire_event(names::INTERACTIVE_MOVE_FINISHED, Some(index_path));
    }

    /// Handles a template writing one of its own parameters.
    ///
    /// Writes to bound row fields are applied to the data set and
    /// republished; global writes update the shared map.
    pub async fn template_parameter_changed(
        &self,
        cell: CellId,
        name: &str,
        value: Value,
    ) -> Result<TemplateWrite, Error> {
        let write = {
            let mut pool = lock(&self.inner.pool);
            let write = match pool.get_mut(cell) {
                Some(cell) => cell.template_wrote(name, value.clone()),
                None => TemplateWrite::Ignored,
            };
            if write == TemplateWrite::Global {
                pool.broadcast_global(name, &value);
            }
            write
        };

        match &write {
            TemplateWrite::Row(row_edit) => {
                let rows = edit::patch_row(&self.inner.pipeline.snapshot(), &row_edit.key, &row_edit.patch)?;
                self.update(DataUpdate::new(rows)).await?;
            }
            TemplateWrite::Global => self.inner.publish(name, value),
            TemplateWrite::Ignored => {}
        }
        Ok(write)
    }

    // =========================================================================
    // Item services
    // =========================================================================

    /// Accepts dropped rows after `after` (or at the end), or replaces the
    /// data when the drop policy says so.
    pub async fn insert_items(&self, rows: Vec<Row>, after: Option<IndexPath>) -> Result<UpdateOutcome, Error> {
        let config = self.inner.config();
        let rows = match config.drop_policy {
            DropPolicy::Replace => rows,
            DropPolicy::Insert => edit::insert_rows(
                &self.inner.pipeline.snapshot(),
                rows,
                after,
                config.section_field.as_deref(),
            )?,
        };
        let outcome = self.update(DataUpdate::new(rows).forced()).await?;
        self.fire_event(names::ITEMS_ACCEPTED, after);
        Ok(outcome)
    }

    pub async fn move_item(&self, from: IndexPath, to: IndexPath) -> Result<UpdateOutcome, Error> {
        let config = self.inner.config();
        if !config.can_move_cells {
            return Err(ConfigError::Disabled("canMoveCells").into());
        }
        let rows = edit::move_row(
            &self.inner.pipeline.snapshot(),
            from,
            to,
            config.section_field.as_deref(),
            config.can_move_cells_across_sections,
        )?;
        let outcome = self.update(DataUpdate::new(rows).forced()).await?;
        self.fire_event(names::ITEMS_MOVED, None);
        Ok(outcome)
    }

    pub async fn move_items(&self, from: &[IndexPath], to: IndexPath) -> Result<UpdateOutcome, Error> {
        let config = self.inner.config();
        if !config.can_move_cells {
            return Err(ConfigError::Disabled("canMoveCells").into());
        }
        let rows = edit::move_rows(
            &self.inner.pipeline.snapshot(),
            from,
            to,
            config.section_field.as_deref(),
            config.can_move_cells_across_sections,
        )?;
        let outcome = self.update(DataUpdate::new(rows).forced()).await?;
        self.fire_event(names::ITEMS_MOVED, None);
        Ok(outcome)
    }

    pub async fn remove_items(&self, paths: &[IndexPath]) -> Result<UpdateOutcome, Error> {
        let rows = edit::remove_rows(&self.inner.pipeline.snapshot(), paths)?;
        let outcome = self.update(DataUpdate::new(rows).forced()).await?;
        self.fire_event(names::ITEMS_REMOVED, None);
        Ok(outcome)
    }

    /// Creates an item from the data shape defaults and starts editing it.
    pub async fn create_item(&self, position: InsertPosition) -> Result<RowKey, Error> {
        let config = self.inner.config();
        let (rows, key) = edit::insert_new_row(
            &self.inner.pipeline.snapshot(),
            &config.data_shape,
            &config.uid_field,
            position,
        )?;
        self.update(DataUpdate::new(rows).forced()).await?;

        if let Some(index_path) = self.inner.pipeline.snapshot().index_path_for(&key) {
            self.begin_editing(index_path)?;
        }
        Ok(key)
    }

    pub async fn delete_item(&self, key: &RowKey) -> Result<UpdateOutcome, Error> {
        let rows = edit::delete_row(&self.inner.pipeline.snapshot(), key)?;
        self.update(DataUpdate::new(rows).forced()).await
    }
}

impl ViewInner {
    fn config(&self) -> CollectionConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, name: &str, value: Value) {
        if let Err(e) = self.host.set_property(name, value) {
            warn!("Publishing '{}' failed: {}", name, e);
        }
    }

    fn selection_publication(
        tracker: &mut SelectionTracker,
        snapshot: &Snapshot,
        broadcast: bool,
    ) -> SelectionPublication {
        let flags = tracker.publication_flags();
        SelectionPublication {
            has_selection: flags.has_selection,
            count: flags.count,
            indices: broadcast.then(|| tracker.published_indices(snapshot)),
        }
    }

    fn send_selection(&self, publication: SelectionPublication) {
        if let Some(has_selection) = publication.has_selection {
            self.publish(names::HAS_SELECTED_CELLS, Value::Bool(has_selection));
        }
        self.publish(names::SELECTED_CELLS_COUNT, Value::from(publication.count));
        if let Some(indices) = publication.indices {
            if let Err(e) = self.host.publish_selection(names::DATA, &indices) {
                warn!("Selection not published: {}", e);
            }
        }
    }

    /// Rebinds every bound cell whose item is still present: index path,
    /// row, selection, editing and template.
    fn refresh_cells(&self, snapshot: &Snapshot, animated: bool) {
        let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
        let tracker = lock(&self.tracker);
        let mut pool = lock(&self.pool);

        for id in pool.bound() {
            let Some(key) = pool.get(id).and_then(Cell::key).cloned() else {
                continue;
            };
            let (Some(index_path), Some(row)) = (snapshot.index_path_for(&key), snapshot.row(&key)) else {
                continue;
            };

            let selected = tracker.is_selected(&key);
            let editing = tracker.is_editing(&key);
            let template = config.template_for(row, selected, editing);

            if let Some(cell) = pool.get_mut(id) {
                cell.set_selected(selected);
                cell.set_editing(editing);
                cell.bind_item(index_path, key, row.clone());
            }
            if let Some(name) = template {
                pool.assign_template(id, &name, animated);
            }
        }
    }
}

impl CommitHooks for ViewInner {
    fn reconciled(&self, snapshot: &Snapshot) {
        let summary = lock(&self.tracker).reconcile(snapshot);
        if summary.editing_dropped > 0 {
            debug!("Dropped {} editing entries", summary.editing_dropped);
        }

        let data_shape = {
            let config = self.config.read().unwrap_or_else(PoisonError::into_inner);
            (!config.data_shape.is_empty()).then(|| config.data_shape.clone())
        };
        self.publish(
            names::DATA,
            Value::Table(RowTable {
                data_shape,
                rows: snapshot.sorted_rows(),
            }),
        );
    }

    fn installed(&self, snapshot: &Snapshot, report: &CommitReport) {
        self.refresh_cells(snapshot, report.layout_invalidated && !report.initial);
    }

    fn committed(&self, snapshot: &Snapshot, report: &CommitReport) {
        let auto_select = self.config.read().unwrap_or_else(PoisonError::into_inner).auto_select_first;
        let (auto_selected, publication) = {
            let mut tracker = lock(&self.tracker);
            let auto_selected = auto_select && tracker.select_first(snapshot);
            (auto_selected, Self::selection_publication(&mut tracker, snapshot, true))
        };
        self.send_selection(publication);
        if auto_selected {
            self.refresh_cells(snapshot, false);
        }
        if report.forced {
            self.engine.invalidate_dragging_index_paths();
        }
    }
}

/// Builder for constructing a [`CollectionView`].
///
/// # Required Components
///
/// - `cache` - shared [`TemplateCache`]
/// - `host` - a [`HostSurface`] implementation
/// - `engine` - a [`VirtualizationEngine`] implementation
/// - `runtime` - a [`TemplateRuntime`] implementation
pub struct CollectionViewBuilder {
    config: CollectionConfig,
    cache: Option<TemplateCache>,
    host: Option<Arc<dyn HostSurface>>,
    engine: Option<Arc<dyn VirtualizationEngine>>,
    runtime: Option<Arc<dyn TemplateRuntime>>,
}

impl CollectionViewBuilder {
    pub fn new(config: CollectionConfig) -> Self {
        Self {
            config,
            cache: None,
            host: None,
            engine: None,
            runtime: None,
        }
    }

    pub fn cache(mut self, cache: TemplateCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn host(mut self, host: Arc<dyn HostSurface>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn VirtualizationEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn runtime(mut self, runtime: Arc<dyn TemplateRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<CollectionView, ConfigError> {
        self.config.validate()?;
        let cache = self.cache.ok_or(ConfigError::Missing("cache"))?;
        let host = self.host.ok_or(ConfigError::Missing("host"))?;
        let engine = self.engine.ok_or(ConfigError::Missing("engine"))?;
        let runtime = self.runtime.ok_or(ConfigError::Missing("runtime"))?;

        let config = self.config;
        let globals = GlobalParameters::new(config.global_parameters.clone());
        let context = CellContext {
            runtime,
            cache: cache.clone(),
            bindings: config.bindings(),
            data_shape: (!config.data_shape.is_empty()).then(|| config.data_shape.clone()),
            selected_parameter: config.selected_parameter.clone().filter(|p| !p.is_empty()),
            editing_parameter: config.editing_parameter.clone().filter(|p| !p.is_empty()),
            globals: globals.clone(),
        };
        let pipeline = Pipeline::new(ReconcileOptions::from(&config), Arc::clone(&engine));
        let tracker = SelectionTracker::new(config.selection_mode);

        Ok(CollectionView {
            inner: Arc::new(ViewInner {
                config: RwLock::new(config),
                cache,
                host,
                engine,
                pipeline,
                globals,
                tracker: Mutex::new(tracker),
                pool: Mutex::new(CellPool::new(Arc::new(context))),
            }),
        })
    }
}
