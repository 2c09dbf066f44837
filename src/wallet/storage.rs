//! Tab-scoped session storage.
//!
//! Holds the connected address so a reload within the same browsing
//! session skips the wallet prompt. Not durable: the store lives exactly as
//! long as its owner.

use dashmap::DashMap;
use std::sync::Arc;

/// Key/value store scoped to one browsing session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory [`SessionStorage`]. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStorage {
    inner: Arc<DashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.inner.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.inner.remove(key);
    }
}
