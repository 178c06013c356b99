//! Collective memory: namespaced long-term records shared by every agent.
//!
//! Key format: `memory:{namespace}:{key}`.

use crate::shared::{Clock, MEMORY_PREFIX};
use crate::store::{self, KeyedStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub t_ms: i64,
    pub namespace: String,
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub provenance: Map<String, Value>,
}

pub struct CollectiveMemory {
    store: Arc<dyn KeyedStore>,
    clock: Arc<dyn Clock>,
}

impl CollectiveMemory {
    pub fn new(store: Arc<dyn KeyedStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn namespace_prefix(namespace: &str) -> String {
        format!("{}{}:", MEMORY_PREFIX, namespace)
    }

    /// Writes (or overwrites) a record. Returns what was stored.
    pub fn write(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        provenance: Option<Map<String, Value>>,
    ) -> MemoryRecord {
        let record = MemoryRecord {
            t_ms: self.clock.now_ms(),
            namespace: namespace.to_string(),
            key: key.to_string(),
            value,
            provenance: provenance.unwrap_or_default(),
        };
        let store_key = format!("{}{}", Self::namespace_prefix(namespace), key);
        store::save(self.store.as_ref(), &store_key, &record);
        tracing::debug!(target: "hive::memory", namespace = namespace, key = key, "memory written");
        record
    }

    pub fn read(&self, namespace: &str, key: &str) -> Option<MemoryRecord> {
        let store_key = format!("{}{}", Self::namespace_prefix(namespace), key);
        store::load(self.store.as_ref(), "memory", &store_key)
    }

    /// Every record in `namespace`, newest first (ties by key).
    pub fn query_prefix(&self, namespace: &str) -> Vec<MemoryRecord> {
        let mut records: Vec<MemoryRecord> = self
            .store
            .keys(&Self::namespace_prefix(namespace))
            .into_iter()
            .filter_map(|k| store::load(self.store.as_ref(), "memory", &k))
            .collect();
        records.sort_by(|a, b| b.t_ms.cmp(&a.t_ms).then_with(|| a.key.cmp(&b.key)));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ManualClock;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn write_read_and_query_newest_first() {
        let clock = Arc::new(ManualClock::new(1));
        let mem = CollectiveMemory::new(Arc::new(MemoryStore::new()), clock.clone());
        mem.write("market", "tam", json!(1_000_000), None);
        clock.advance(5);
        let mut prov = Map::new();
        prov.insert("agent_id".to_string(), json!("a1"));
        mem.write("market", "icp", json!("smb"), Some(prov));
        mem.write("ops", "oncall", json!("a2"), None);

        let rec = mem.read("market", "icp").unwrap();
        assert_eq!(rec.value, json!("smb"));
        assert_eq!(rec.provenance["agent_id"], "a1");
        assert!(mem.read("market", "nope").is_none());

        let keys: Vec<_> = mem.query_prefix("market").into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["icp", "tam"]);
        assert_eq!(mem.query_prefix("ops").len(), 1);
        // `market` must not match `marketing`.
        mem.write("marketing", "x", json!(0), None);
        assert_eq!(mem.query_prefix("market").len(), 2);
    }
}
