//! Volatile in-process store.

use super::{shallow_merge, KeyedStore};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// Thread-safe ordered map. Not a CRDT: last write wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.write().remove(key)
    }
}

impl KeyedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.data.write().insert(key.to_string(), value);
    }

    fn merge(&self, key: &str, delta: Value) {
        let mut data = self.data.write();
        let current = data.remove(key);
        data.insert(key.to_string(), shallow_merge(current, delta));
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        self.data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }
}
