//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use collection_view_lib::CollectionView;
use collection_view_lib::config::CollectionConfig;
use collection_view_lib::engine::DataSet;
use collection_view_lib::engine::Transition;
use collection_view_lib::engine::VirtualizationEngine;
use collection_view_lib::error::ConfigError;
use collection_view_lib::error::FetchError;
use collection_view_lib::error::PublishError;
use collection_view_lib::host::Fade;
use collection_view_lib::host::HostSurface;
use collection_view_lib::host::TemplateHandle;
use collection_view_lib::host::TemplateRuntime;
use collection_view_lib::model::Row;
use collection_view_lib::model::Value;
use collection_view_lib::template::TemplateCache;
use collection_view_lib::template::TemplateDefinition;
use collection_view_lib::template::TemplateFetcher;

// =============================================================================
// Fetcher
// =============================================================================

/// Serves definitions from memory and counts requests per name.
#[derive(Default)]
pub struct CountingFetcher {
    definitions: HashMap<String, TemplateDefinition>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    delays: HashMap<String, Duration>,
}

impl CountingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, definition: TemplateDefinition) -> Self {
        self.definitions.insert(definition.name.clone(), definition);
        self
    }

    pub fn with_templates(self, names: &[&str]) -> Self {
        names
            .iter()
            .fold(self, |fetcher, name| fetcher.with_template(TemplateDefinition::new(*name)))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Serves `name` only after `delay`, independent of [`with_delay`](Self::with_delay).
    pub fn with_slow_template(mut self, name: &str, delay: Duration) -> Self {
        self.delays.insert(name.to_string(), delay);
        self.with_template(TemplateDefinition::new(name))
    }

    /// Makes requests for `name` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn recover(&self, name: &str) {
        self.failing.lock().unwrap().remove(name);
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    fn serve(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        *self.calls.lock().unwrap().entry(name.to_string()).or_default() += 1;
        if self.failing.lock().unwrap().contains(name) {
            return Err(FetchError::network(name, "connection refused"));
        }
        self.definitions
            .get(name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl TemplateFetcher for CountingFetcher {
    async fn fetch(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        if let Some(delay) = self.delays.get(name).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.serve(name)
    }

    fn fetch_blocking(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        self.serve(name)
    }
}

/// Lets a test keep a handle on the fetcher after the cache owns it.
pub struct SharedFetcher(pub Arc<CountingFetcher>);

#[async_trait]
impl TemplateFetcher for SharedFetcher {
    async fn fetch(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        self.0.fetch(name).await
    }

    fn fetch_blocking(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        self.0.fetch_blocking(name)
    }
}

// =============================================================================
// Template runtime
// =============================================================================

/// Something a template instance was told to do.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeEvent {
    Created(String),
    Parameter(String, String, Value),
    Loaded(String),
    Layout(String),
    Fade(String, Fade),
    Destroyed(String),
}

pub type RuntimeLog = Arc<Mutex<Vec<RuntimeEvent>>>;

/// Creates instances that append everything they receive to a shared log.
#[derive(Default)]
pub struct RecordingRuntime {
    log: RuntimeLog,
    broken: Mutex<HashSet<String>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes instantiation of `template` fail.
    pub fn break_template(&self, template: &str) {
        self.broken.lock().unwrap().insert(template.to_string());
    }

    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }

    pub fn created(&self, template: &str) -> usize {
        self.count(|e| matches!(e, RuntimeEvent::Created(t) if t == template))
    }

    pub fn destroyed(&self, template: &str) -> usize {
        self.count(|e| matches!(e, RuntimeEvent::Destroyed(t) if t == template))
    }

    /// Values sent to `parameter` of any `template` instance, in order.
    pub fn parameter_values(&self, template: &str, parameter: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RuntimeEvent::Parameter(t, p, v) if t == template && p == parameter => Some(v),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&RuntimeEvent) -> bool) -> usize {
        self.log.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl TemplateRuntime for RecordingRuntime {
    fn instantiate(&self, definition: &TemplateDefinition) -> Result<Box<dyn TemplateHandle>, ConfigError> {
        if self.broken.lock().unwrap().contains(&definition.name) {
            return Err(ConfigError::build(&definition.name, "broken template"));
        }
        self.log
            .lock()
            .unwrap()
            .push(RuntimeEvent::Created(definition.name.clone()));
        Ok(Box::new(RecordingHandle {
            template: definition.name.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingHandle {
    template: String,
    log: RuntimeLog,
}

impl RecordingHandle {
    fn record(&self, event: RuntimeEvent) {
        self.log.lock().unwrap().push(event);
    }
}

impl TemplateHandle for RecordingHandle {
    fn set_parameter(&mut self, name: &str, value: &Value) {
        self.record(RuntimeEvent::Parameter(self.template.clone(), name.to_string(), value.clone()));
    }

    fn fire_loaded(&mut self) {
        self.record(RuntimeEvent::Loaded(self.template.clone()));
    }

    fn layout_changed(&mut self) {
        self.record(RuntimeEvent::Layout(self.template.clone()));
    }

    fn begin_fade(&mut self, fade: Fade) {
        self.record(RuntimeEvent::Fade(self.template.clone(), fade));
    }

    fn destroy(&mut self) {
        self.record(RuntimeEvent::Destroyed(self.template.clone()));
    }
}

// =============================================================================
// Host
// =============================================================================

/// Records property writes, events and selection publications.
#[derive(Default)]
pub struct RecordingHost {
    properties: Mutex<HashMap<String, Value>>,
    writes: Mutex<Vec<String>>,
    events: Mutex<Vec<String>>,
    selections: Mutex<Vec<Vec<usize>>>,
    rejected: Mutex<HashSet<String>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&self, property: &str) {
        self.rejected.lock().unwrap().insert(property.to_string());
    }

    /// Number of times `property` was written.
    pub fn writes(&self, property: &str) -> usize {
        self.writes.lock().unwrap().iter().filter(|w| *w == property).count()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn selections(&self) -> Vec<Vec<usize>> {
        self.selections.lock().unwrap().clone()
    }

    pub fn last_selection(&self) -> Option<Vec<usize>> {
        self.selections.lock().unwrap().last().cloned()
    }

    /// Rows of the last published data table.
    pub fn data_rows(&self) -> Vec<Row> {
        self.property("Data")
            .and_then(|v| v.as_table().map(|t| t.rows.clone()))
            .unwrap_or_default()
    }
}

impl HostSurface for RecordingHost {
    fn property(&self, name: &str) -> Option<Value> {
        self.properties.lock().unwrap().get(name).cloned()
    }

    fn set_property(&self, name: &str, value: Value) -> Result<(), PublishError> {
        if self.rejected.lock().unwrap().contains(name) {
            return Err(PublishError::rejected(name, "read-only"));
        }
        self.writes.lock().unwrap().push(name.to_string());
        self.properties.lock().unwrap().insert(name.to_string(), value);
        Ok(())
    }

    fn fire_event(&self, name: &str) {
        self.events.lock().unwrap().push(name.to_string());
    }

    fn publish_selection(&self, _property: &str, indices: &[usize]) -> Result<(), PublishError> {
        self.selections.lock().unwrap().push(indices.to_vec());
        Ok(())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Records install and transition calls. Transitions can be slowed down to
/// let other updates queue up behind them.
#[derive(Default)]
pub struct ScriptedEngine {
    installs: AtomicUsize,
    transitions: Mutex<Vec<Transition>>,
    invalidations: AtomicUsize,
    movement_waits: AtomicUsize,
    transition_delay: Option<Duration>,
    seen_counts: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = Some(delay);
        self
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }

    pub fn movement_waits(&self) -> usize {
        self.movement_waits.load(Ordering::SeqCst)
    }

    /// Row counts (old data, new data) observed in section 0 during each
    /// transition.
    pub fn seen_counts(&self) -> Vec<(usize, usize)> {
        self.seen_counts.lock().unwrap().clone()
    }
}

fn rows_in_first_section(data: &dyn DataSet) -> usize {
    if data.number_of_sections() == 0 {
        0
    } else {
        data.number_of_rows(0)
    }
}

#[async_trait]
impl VirtualizationEngine for ScriptedEngine {
    fn install(&self, _data: &dyn DataSet) {
        self.installs.fetch_add(1, Ordering::SeqCst);
    }

    async fn transition(&self, data: &dyn DataSet, transition: Transition) {
        self.transitions.lock().unwrap().push(transition);

        data.use_old_data(true);
        let old = rows_in_first_section(data);
        data.use_old_data(false);
        let new = rows_in_first_section(data);
        self.seen_counts.lock().unwrap().push((old, new));

        if let Some(delay) = self.transition_delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn interactive_movement_finished(&self) {
        self.movement_waits.fetch_add(1, Ordering::SeqCst);
    }

    fn invalidate_dragging_index_paths(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub fn row(id: i64, name: &str) -> Row {
    Row::new().set("id", id).set("name", name)
}

pub fn rows(items: &[(i64, &str)]) -> Vec<Row> {
    items.iter().map(|(id, name)| row(*id, name)).collect()
}

/// A view wired to recording doubles, with every referenced template
/// available.
pub struct Harness {
    pub view: CollectionView,
    pub fetcher: Arc<CountingFetcher>,
    pub runtime: Arc<RecordingRuntime>,
    pub host: Arc<RecordingHost>,
    pub engine: Arc<ScriptedEngine>,
}

impl Harness {
    pub fn new(config: CollectionConfig) -> Self {
        Self::with_engine(config, ScriptedEngine::new())
    }

    pub fn with_engine(config: CollectionConfig, engine: ScriptedEngine) -> Self {
        let mut names = config.template_names();
        names.push("Special".to_string());
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let fetcher = CountingFetcher::new().with_templates(&name_refs);
        Self::with_fetcher(config, fetcher, engine)
    }

    pub fn with_fetcher(config: CollectionConfig, fetcher: CountingFetcher, engine: ScriptedEngine) -> Self {
        let fetcher = Arc::new(fetcher);

        let runtime = Arc::new(RecordingRuntime::new());
        let host = Arc::new(RecordingHost::new());
        let engine = Arc::new(engine);

        let view = CollectionView::builder(config)
            .cache(TemplateCache::new(SharedFetcher(Arc::clone(&fetcher))))
            .host(Arc::clone(&host) as Arc<dyn HostSurface>)
            .engine(Arc::clone(&engine) as Arc<dyn VirtualizationEngine>)
            .runtime(Arc::clone(&runtime) as Arc<dyn TemplateRuntime>)
            .build()
            .expect("valid configuration");

        Self {
            view,
            fetcher,
            runtime,
            host,
            engine,
        }
    }

    /// Starts the view and commits `rows`.
    pub async fn started_with(config: CollectionConfig, rows: Vec<Row>) -> Self {
        let harness = Self::new(config);
        harness.view.start().await;
        harness.view.update_data(Some(rows)).await.expect("initial data");
        harness
    }
}

/// Default configuration: uid `id`, template `Card`, `name` bound to `label`.
pub fn card_config() -> CollectionConfig {
    CollectionConfig::new("id")
        .with_template("Card")
        .with_bindings(r#"{"name": "label"}"#)
}
