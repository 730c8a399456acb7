//! Serialized data updates

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use log::debug;
use log::error;
use tokio::sync::Mutex;
use tokio::sync::watch;

use super::ReconcileOptions;
use super::Snapshot;
use super::build_snapshot;
use super::requires_layout;
use crate::engine::DataSet;
use crate::engine::Transition;
use crate::engine::VirtualizationEngine;
use crate::error::ReconcileError;
use crate::model::IndexPath;
use crate::model::Row;
use crate::model::RowKey;

/// A request to replace the data set.
#[derive(Debug, Clone, Default)]
pub struct DataUpdate {
    /// New rows. `None` stands for an absent or failed data source and is
    /// treated as an empty set.
    pub rows: Option<Vec<Row>>,
    /// Recompute layout even if nothing geometric changed, and do not wait
    /// for an interactive movement to end.
    pub force_layout: bool,
}

impl DataUpdate {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: Some(rows),
            force_layout: false,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Marks the update as forcing a layout pass (builder pattern).
    pub fn forced(mut self) -> Self {
        self.force_layout = true;
        self
    }
}

/// What a committed update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    /// First data set ever installed.
    pub initial: bool,
    pub layout_invalidated: bool,
    pub forced: bool,
    pub previous_count: usize,
    pub count: usize,
    pub sections: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Committed(CommitReport),
    /// A newer update arrived while this one was queued.
    Superseded,
}

impl UpdateOutcome {
    pub fn report(&self) -> Option<&CommitReport> {
        match self {
            UpdateOutcome::Committed(report) => Some(report),
            UpdateOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, UpdateOutcome::Superseded)
    }
}

/// A place in the update order, taken when an update is issued.
///
/// Updates holding an older ticket than the latest one return
/// [`UpdateOutcome::Superseded`] instead of committing.
#[derive(Debug, PartialEq, Eq)]
pub struct UpdateTicket(u64);

/// Observable pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    Idle = 0,
    Queued = 1,
    Diffing = 2,
    Committing = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            2 => PipelineState::Diffing,
            3 => PipelineState::Committing,
            1 => PipelineState::Queued,
            _ => PipelineState::Idle,
        }
    }
}

/// Callbacks run by the pipeline while it holds the update gate.
pub trait CommitHooks: Send + Sync {
    /// The new snapshot is built but not yet visible.
    fn reconciled(&self, _snapshot: &Snapshot) {}

    /// The new snapshot became current. For invalidating updates this runs
    /// before the engine transition starts.
    fn installed(&self, _snapshot: &Snapshot, _report: &CommitReport) {}

    /// The engine finished installing or transitioning.
    fn committed(&self, _snapshot: &Snapshot, _report: &CommitReport) {}
}

impl CommitHooks for () {}

/// Serializes data updates and owns the committed snapshot.
///
/// Only one update reconciles at a time. Updates that queue up behind it are
/// coalesced: when the gate opens, only the most recently issued one runs and
/// the others return [`UpdateOutcome::Superseded`].
///
/// The pipeline is cheap to clone (uses `Arc` internally).
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    options: RwLock<ReconcileOptions>,
    engine: Arc<dyn VirtualizationEngine>,
    current: RwLock<Arc<Snapshot>>,
    previous: RwLock<Option<Arc<Snapshot>>>,
    using_old: AtomicBool,
    updating: AtomicBool,
    installed: AtomicBool,
    gate: Mutex<()>,
    latest: AtomicU64,
    waiting: AtomicUsize,
    state: AtomicU8,
    rendered: watch::Sender<bool>,
}

impl Pipeline {
    pub fn new(options: ReconcileOptions, engine: Arc<dyn VirtualizationEngine>) -> Self {
        let (rendered, _) = watch::channel(false);
        Self {
            inner: Arc::new(PipelineInner {
                options: RwLock::new(options),
                engine,
                current: RwLock::new(Arc::new(Snapshot::empty())),
                previous: RwLock::new(None),
                using_old: AtomicBool::new(false),
                updating: AtomicBool::new(false),
                installed: AtomicBool::new(false),
                gate: Mutex::new(()),
                latest: AtomicU64::new(0),
                waiting: AtomicUsize::new(0),
                state: AtomicU8::new(PipelineState::Idle as u8),
                rendered,
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn options(&self) -> ReconcileOptions {
        self.inner.options.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the reconcile options. Takes effect with the next update.
    pub fn set_options(&self, options: ReconcileOptions) {
        *self.inner.options.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    /// Returns `true` while an animated transition is running.
    pub fn is_updating(&self) -> bool {
        self.inner.updating.load(Ordering::SeqCst)
    }

    /// Returns `true` once the first data set has been installed.
    pub fn is_installed(&self) -> bool {
        self.inner.installed.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PipelineState {
        let state = PipelineState::from_u8(self.inner.state.load(Ordering::SeqCst));
        if state == PipelineState::Idle && self.inner.waiting.load(Ordering::SeqCst) > 0 {
            PipelineState::Queued
        } else {
            state
        }
    }

    fn set_state(&self, state: PipelineState) {
        self.inner.state.store(state as u8, Ordering::SeqCst);
    }

    // =========================================================================
    // Render gate
    // =========================================================================

    /// Lets updates through. Until this is called every update waits.
    pub fn open_render_gate(&self) {
        self.inner.rendered.send_replace(true);
    }

    pub fn is_render_gate_open(&self) -> bool {
        *self.inner.rendered.borrow()
    }

    async fn wait_until_rendered(&self) {
        let mut rendered = self.inner.rendered.subscribe();
        // The sender lives as long as the pipeline, so this only returns once open.
        let _ = rendered.wait_for(|open| *open).await;
    }

    // =========================================================================
    // Updates
    // =========================================================================

    /// Takes the next place in the update order. Callers that prepare an
    /// update asynchronously reserve before preparing so that issue order,
    /// not preparation time, decides which update wins.
    pub fn reserve(&self) -> UpdateTicket {
        UpdateTicket(self.inner.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Returns `true` if no update was issued after `ticket`.
    pub fn is_latest(&self, ticket: &UpdateTicket) -> bool {
        self.inner.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Reconciles and commits `update`, or returns
    /// [`UpdateOutcome::Superseded`] if a newer update was issued while this
    /// one waited.
    ///
    /// On error the previously committed snapshot stays active.
    pub async fn update(&self, update: DataUpdate, hooks: &dyn CommitHooks) -> Result<UpdateOutcome, ReconcileError> {
        let ticket = self.reserve();
        self.update_reserved(ticket, update, hooks).await
    }

    /// Like [`update`](Self::update), with the place in the order taken
    /// earlier by [`reserve`](Self::reserve).
    pub async fn update_reserved(
        &self,
        ticket: UpdateTicket,
        update: DataUpdate,
        hooks: &dyn CommitHooks,
    ) -> Result<UpdateOutcome, ReconcileError> {
        self.wait_until_rendered().await;

        self.inner.waiting.fetch_add(1, Ordering::SeqCst);
        let _gate = self.inner.gate.lock().await;
        self.inner.waiting.fetch_sub(1, Ordering::SeqCst);

        if !self.is_latest(&ticket) {
            debug!("Data update {} superseded", ticket.0);
            return Ok(UpdateOutcome::Superseded);
        }

        let result = self.reconcile_and_commit(update, hooks).await;
        self.set_state(PipelineState::Idle);
        result
    }

    async fn reconcile_and_commit(
        &self,
        update: DataUpdate,
        hooks: &dyn CommitHooks,
    ) -> Result<UpdateOutcome, ReconcileError> {
        if !update.force_layout {
            self.inner.engine.interactive_movement_finished().await;
        }

        self.set_state(PipelineState::Diffing);
        let options = self.options();
        let snapshot = build_snapshot(update.rows.unwrap_or_default(), &options).inspect_err(|e| {
            error!("Data update rejected: {}", e);
        })?;

        let previous = self.snapshot();
        let initial = !self.is_installed();
        let layout_invalidated = initial || update.force_layout || requires_layout(&previous, &snapshot, &options);
        hooks.reconciled(&snapshot);

        self.set_state(PipelineState::Committing);
        let report = CommitReport {
            initial,
            layout_invalidated,
            forced: update.force_layout,
            previous_count: previous.len(),
            count: snapshot.len(),
            sections: snapshot.number_of_sections(),
        };
        debug!("Committing data update: {:?}", report);

        let snapshot = Arc::new(snapshot);
        if initial {
            self.replace_current(Arc::clone(&snapshot));
            self.inner.engine.install(self);
            self.inner.installed.store(true, Ordering::SeqCst);
            hooks.installed(&snapshot, &report);
        } else if layout_invalidated {
            *self.inner.previous.write().unwrap_or_else(PoisonError::into_inner) = Some(previous);
            self.replace_current(Arc::clone(&snapshot));
            self.inner.updating.store(true, Ordering::SeqCst);
            hooks.installed(&snapshot, &report);

            let transition = Transition {
                previous_count: report.previous_count,
                count: report.count,
                animated: true,
            };
            self.inner.engine.transition(self, transition).await;

            self.inner.updating.store(false, Ordering::SeqCst);
            self.inner.using_old.store(false, Ordering::SeqCst);
            *self.inner.previous.write().unwrap_or_else(PoisonError::into_inner) = None;
        } else {
            self.replace_current(Arc::clone(&snapshot));
            hooks.installed(&snapshot, &report);
        }

        hooks.committed(&snapshot, &report);
        Ok(UpdateOutcome::Committed(report))
    }

    fn replace_current(&self, snapshot: Arc<Snapshot>) {
        *self.inner.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Snapshot served to the engine: the previous one while it asked for old
    /// data during a transition.
    fn active(&self) -> Arc<Snapshot> {
        if self.inner.using_old.load(Ordering::SeqCst) {
            if let Some(previous) = self.inner.previous.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
                return Arc::clone(previous);
            }
        }
        self.snapshot()
    }
}

impl DataSet for Pipeline {
    fn number_of_sections(&self) -> usize {
        self.active().number_of_sections()
    }

    fn number_of_rows(&self, section: usize) -> usize {
        self.active().number_of_rows(section)
    }

    fn index_path_for(&self, key: &RowKey) -> Option<IndexPath> {
        self.active().index_path_for(key)
    }

    fn row_at(&self, index_path: IndexPath) -> Option<Row> {
        self.active().row_at(index_path).cloned()
    }

    fn identifier_for(&self, index_path: IndexPath) -> Option<RowKey> {
        self.active().key_at(index_path).cloned()
    }

    fn use_old_data(&self, use_old: bool) {
        self.inner.using_old.store(use_old, Ordering::SeqCst);
    }

    fn is_using_old_data(&self) -> bool {
        self.inner.using_old.load(Ordering::SeqCst) && self.is_updating()
    }
}
