//! Coalescing template definition cache

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use futures::future::join_all;
use log::debug;
use log::warn;
use tokio::runtime::Handle;

use super::TemplateDefinition;
use super::TemplateFetcher;
use crate::error::FetchError;

/// Outcome of a settled fetch, shared by every waiter.
pub type FetchResult = Result<Arc<TemplateDefinition>, FetchError>;

/// An in-flight retrieval of a template definition.
///
/// Every caller asking for the same name while the fetch is in flight gets a
/// clone of the same handle. Inside a tokio runtime the fetch is driven by its
/// own task from the moment it starts, so dropping every handle does not stop
/// it. Outside a runtime it runs when the first handle is awaited. Either way
/// it settles exactly once.
#[derive(Clone)]
pub struct PendingFetch {
    name: Arc<str>,
    future: Shared<BoxFuture<'static, FetchResult>>,
}

impl PendingFetch {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the fetch to settle.
    pub async fn wait(self) -> FetchResult {
        self.future.await
    }

    /// Runs the fetch on the current tokio runtime, if there is one.
    fn drive(&self) {
        match Handle::try_current() {
            Ok(runtime) => drop(runtime.spawn(self.future.clone())),
            Err(_) => debug!("No runtime to drive template fetch '{}'; it starts when awaited", self.name),
        }
    }
}

impl fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch").field("name", &self.name).finish()
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone)]
pub enum TemplateLookup {
    /// The definition was cached.
    Ready(Arc<TemplateDefinition>),
    /// The definition is being fetched.
    Pending(PendingFetch),
}

impl TemplateLookup {
    /// Waits for the definition, returning immediately when it was cached.
    pub async fn resolve(self) -> FetchResult {
        match self {
            TemplateLookup::Ready(definition) => Ok(definition),
            TemplateLookup::Pending(fetch) => fetch.wait().await,
        }
    }
}

/// Keyed store of template definitions with request coalescing.
///
/// The cache is cheap to clone (uses `Arc` internally); clones share the same
/// store. Construct one at startup and hand it to every view that should share
/// definitions.
///
/// # Example
///
/// ```ignore
/// use collection_view_lib::template::{TemplateCache, TemplateLookup};
///
/// let cache = TemplateCache::new(fetcher);
/// let definition = cache.get("Card").resolve().await?;
/// ```
#[derive(Clone)]
pub struct TemplateCache {
    inner: Arc<TemplateCacheInner>,
}

struct TemplateCacheInner {
    fetcher: Arc<dyn TemplateFetcher>,
    definitions: DashMap<String, Arc<TemplateDefinition>>,
    pending: Mutex<HashMap<String, PendingFetch>>,
}

impl TemplateCache {
    pub fn new(fetcher: impl TemplateFetcher + 'static) -> Self {
        Self::from_arc(Arc::new(fetcher))
    }

    pub fn from_arc(fetcher: Arc<dyn TemplateFetcher>) -> Self {
        Self {
            inner: Arc::new(TemplateCacheInner {
                fetcher,
                definitions: DashMap::new(),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Looks up a definition, starting or joining a fetch when it is not cached.
    pub fn get(&self, name: &str) -> TemplateLookup {
        if let Some(definition) = self.cached(name) {
            return TemplateLookup::Ready(definition);
        }

        let mut pending = self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner);

        // A fetch may have settled between the first check and taking the lock.
        if let Some(definition) = self.cached(name) {
            return TemplateLookup::Ready(definition);
        }
        if let Some(fetch) = pending.get(name) {
            debug!("Joining pending fetch for template '{}'", name);
            return TemplateLookup::Pending(fetch.clone());
        }

        let fetch = self.start_fetch(name);
        pending.insert(name.to_string(), fetch.clone());
        fetch.drive();
        TemplateLookup::Pending(fetch)
    }

    /// Looks up a definition without suspending.
    ///
    /// Bypasses coalescing: a miss performs its own blocking fetch even when
    /// an asynchronous fetch for the same name is in flight.
    pub fn get_blocking(&self, name: &str) -> FetchResult {
        if let Some(definition) = self.cached(name) {
            return Ok(definition);
        }

        let definition = Arc::new(self.inner.fetcher.fetch_blocking(name)?);
        self.inner.definitions.insert(name.to_string(), Arc::clone(&definition));
        Ok(definition)
    }

    /// Returns the definition only if it is already cached.
    pub fn cached(&self, name: &str) -> Option<Arc<TemplateDefinition>> {
        self.inner.definitions.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Stores a definition directly, replacing any cached one.
    pub fn insert(&self, definition: TemplateDefinition) -> Arc<TemplateDefinition> {
        let definition = Arc::new(definition);
        self.inner.definitions.insert(definition.name.clone(), Arc::clone(&definition));
        definition
    }

    /// Fetches every named definition, returning the names that failed.
    pub async fn preload<I, S>(&self, names: I) -> Vec<(String, FetchError)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lookups: Vec<(String, TemplateLookup)> = names
            .into_iter()
            .map(|name| (name.as_ref().to_string(), self.get(name.as_ref())))
            .collect();

        let results = join_all(lookups.into_iter().map(|(name, lookup)| async move {
            (name, lookup.resolve().await)
        }))
        .await;

        results
            .into_iter()
            .filter_map(|(name, result)| result.err().map(|e| (name, e)))
            .collect()
    }

    /// Drops every cached definition. In-flight fetches are not cancelled and
    /// store their result when they settle.
    pub fn invalidate(&self) {
        debug!("Invalidating {} cached template definitions", self.inner.definitions.len());
        self.inner.definitions.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.definitions.contains_key(name)
    }

    /// Returns the number of cached definitions.
    pub fn len(&self) -> usize {
        self.inner.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.definitions.is_empty()
    }

    /// Returns the number of fetches currently in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn start_fetch(&self, name: &str) -> PendingFetch {
        let fetcher = Arc::clone(&self.inner.fetcher);
        let cache = Arc::downgrade(&self.inner);
        let owned = name.to_string();

        let future = async move {
            debug!("Fetching template definition '{}'", owned);
            let result = fetcher.fetch(&owned).await.map(Arc::new);

            if let Some(cache) = cache.upgrade() {
                // Stored before any waiter resumes.
                match &result {
                    Ok(definition) => {
                        cache.definitions.insert(owned.clone(), Arc::clone(definition));
                    }
                    Err(e) => warn!("Template '{}' could not be fetched: {}", owned, e),
                }
                cache
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&owned);
            }
            result
        }
        .boxed()
        .shared();

        PendingFetch {
            name: Arc::from(name),
            future,
        }
    }
}

impl fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCache")
            .field("cached", &self.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}
