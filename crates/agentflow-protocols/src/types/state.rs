//! Shared session state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Mutable key/value state shared by reference across every node of a run.
///
/// Cloning a `SessionState` yields another handle to the same map. No
/// ordering is imposed between concurrent writers: two writers of the same
/// key race and the last write wins.
#[derive(Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<HashMap<String, serde_json::Value>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.read().get(key).cloned()
    }

    /// Get a string value, if the key holds one.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .get(key)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Set a value, returning the previous one.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.inner.write().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Apply every entry of a state delta.
    pub fn apply(&self, delta: &HashMap<String, serde_json::Value>) {
        let mut map = self.inner.write();
        for (key, value) in delta {
            map.insert(key.clone(), value.clone());
        }
    }

    /// Point-in-time copy of the whole map.
    pub fn snapshot(&self) -> HashMap<String, serde_json::Value> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Whether two handles refer to the same underlying map.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.inner.read().iter()).finish()
    }
}

impl From<HashMap<String, serde_json::Value>> for SessionState {
    fn from(map: HashMap<String, serde_json::Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }
}
