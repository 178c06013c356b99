//! Keyed store: the ordered key-value substrate every hive component is built on.
//!
//! | Type              | Durability | Failure behaviour                                   |
//! |-------------------|-----------|------------------------------------------------------|
//! | [`MemoryStore`]   | volatile  | infallible                                           |
//! | [`DurableStore`]  | sled      | backend errors are logged; a volatile cache answers  |
//!
//! Components receive an `Arc<dyn KeyedStore>`; nothing in the crate holds a global store.

mod durable;
mod memory;
mod sled_backend;

pub use durable::DurableStore;
pub use memory::MemoryStore;
pub use sled_backend::SledBackend;

use crate::error::StoreError;
use crate::shared::StorageConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Abstract ordered key-value substrate.
///
/// Implementations must be safe to share across threads. Each call is atomic on its own;
/// nothing spans two calls, so components that read-modify-write hold their own lock.
pub trait KeyedStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value);

    /// Shallow merge: object fields in `delta` overwrite fields of the current object;
    /// any other combination replaces the value.
    fn merge(&self, key: &str, delta: Value);

    /// Keys starting with `prefix`, ascending.
    fn keys(&self, prefix: &str) -> Vec<String>;
}

/// Fallible persistent backend wrapped by [`DurableStore`].
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError>;

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    fn flush(&self) -> Result<(), StoreError>;
}

/// Applies the shallow-merge rule shared by every store.
pub fn shallow_merge(current: Option<Value>, delta: Value) -> Value {
    match (current, delta) {
        (Some(Value::Object(mut cur)), Value::Object(delta)) => {
            for (k, v) in delta {
                cur.insert(k, v);
            }
            Value::Object(cur)
        }
        (_, delta) => delta,
    }
}

/// Serializes an entity for storage under `key`.
pub fn encode<T: Serialize>(key: &str, entity: &T) -> Result<Value, StoreError> {
    serde_json::to_value(entity).map_err(|e| StoreError::Encode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes a stored record into one entity kind. Malformed records are an error, never a guess.
pub fn decode<T: DeserializeOwned>(
    entity: &'static str,
    key: &str,
    value: Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Decode {
        entity,
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Reads and decodes `key`, logging and swallowing malformed records.
pub(crate) fn load<T: DeserializeOwned>(
    store: &dyn KeyedStore,
    entity: &'static str,
    key: &str,
) -> Option<T> {
    let value = store.get(key)?;
    match decode(entity, key, value) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(
                target: "hive::store",
                key = key,
                error = %e,
                "skipping malformed record"
            );
            None
        }
    }
}

/// Encodes and writes `entity`, logging encode failures.
pub(crate) fn save<T: Serialize>(store: &dyn KeyedStore, key: &str, entity: &T) -> bool {
    match encode(key, entity) {
        Ok(value) => {
            store.set(key, value);
            true
        }
        Err(e) => {
            tracing::warn!(target: "hive::store", key = key, error = %e, "record not written");
            false
        }
    }
}

/// Opens the store named by `storage.backend`.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn KeyedStore>, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sled" => {
            let backend = SledBackend::open_path(&config.path)?;
            Ok(Arc::new(DurableStore::new(backend)))
        }
        other => Err(StoreError::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shallow_merge_overwrites_top_level_fields_only() {
        let cur = json!({"a": 1, "nested": {"x": 1, "y": 2}});
        let merged = shallow_merge(Some(cur), json!({"b": 2, "nested": {"x": 9}}));
        assert_eq!(merged, json!({"a": 1, "b": 2, "nested": {"x": 9}}));
    }

    #[test]
    fn shallow_merge_replaces_non_objects() {
        assert_eq!(shallow_merge(Some(json!(3)), json!({"a": 1})), json!({"a": 1}));
        assert_eq!(shallow_merge(Some(json!({"a": 1})), json!(7)), json!(7));
        assert_eq!(shallow_merge(None, json!("v")), json!("v"));
    }

    #[test]
    fn decode_rejects_malformed_records() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Probe {
            id: String,
        }
        let err = decode::<Probe>("probe", "probe:1", json!({"id": 42})).unwrap_err();
        assert!(matches!(err, StoreError::Decode { entity: "probe", .. }));
    }

    #[test]
    fn open_store_rejects_unknown_backend() {
        let cfg = StorageConfig {
            backend: "etcd".to_string(),
            path: String::new(),
        };
        assert!(matches!(
            open_store(&cfg),
            Err(StoreError::UnknownBackend(b)) if b == "etcd"
        ));
    }

    #[test]
    fn open_store_sled_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StorageConfig {
            backend: "sled".to_string(),
            path: dir.path().join("db").to_string_lossy().into_owned(),
        };
        let store = open_store(&cfg).unwrap();
        store.set("k", json!({"v": 1}));
        assert_eq!(store.get("k"), Some(json!({"v": 1})));
    }
}
