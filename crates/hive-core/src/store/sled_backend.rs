//! Sled-backed persistent backend. Records are JSON bytes in a single tree.

use super::StoreBackend;
use crate::error::StoreError;
use serde_json::Value;
use sled::{Db, Tree};
use std::path::Path;

const TREE_NAME: &str = "hive_core";

pub struct SledBackend {
    db: Db,
    tree: Tree,
}

impl SledBackend {
    /// Opens or creates the hive DB at the given path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let tree = db.open_tree(TREE_NAME)?;
        Ok(Self { db, tree })
    }

    /// Number of records in the tree.
    pub fn count(&self) -> usize {
        self.tree.len()
    }
}

impl StoreBackend for SledBackend {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let Some(bytes) = self.tree.get(key.as_bytes())? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Decode {
                entity: "json",
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        let prev = self.tree.insert(key.as_bytes(), bytes.as_slice())?;
        tracing::debug!(
            target: "hive::store",
            key = key,
            bytes = bytes.len(),
            action = if prev.is_some() { "UPDATE" } else { "INSERT" },
            "sled write"
        );
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        for item in self.tree.scan_prefix(prefix.as_bytes()).keys() {
            let k = item?;
            if let Ok(key) = String::from_utf8(k.to_vec()) {
                out.push(key);
            }
        }
        Ok(out)
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}
