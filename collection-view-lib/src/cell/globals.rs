use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::model::Value;

/// Parameters shared by every template of a view.
///
/// Cheap to clone; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct GlobalParameters {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl GlobalParameters {
    pub fn new(initial: HashMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    /// Returns `true` if `name` is a declared global parameter.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
    }

    /// Sets a value. Returns true if it changed.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.get(name) == Some(&value) {
            return false;
        }
        map.insert(name.to_string(), value);
        true
    }

    /// Copies every entry, sorted by name.
    pub fn entries(&self) -> Vec<(String, Value)> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<(String, Value)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
