//! Persistent store over a fallible backend, with a volatile fallback for failed writes.
//!
//! Backend failures never reach callers. They are logged, the store is flagged as degraded,
//! and writes the backend refused are parked in an in-process cache. The cache holds only
//! those parked writes: the next successful backend write (or `flush`) replays them, and a
//! key leaves the cache as soon as the backend has it. Parked writes are lost if the process
//! exits before a replay succeeds. While the backend is down, records it already held cannot
//! be read.

use super::{shallow_merge, KeyedStore, MemoryStore, StoreBackend};
use crate::error::StoreError;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub struct DurableStore<B: StoreBackend> {
    backend: B,
    /// Writes the backend has not accepted yet.
    cache: MemoryStore,
    degraded: AtomicBool,
    failures: AtomicU64,
    /// Serializes writes, merges and replays.
    write_lock: Mutex<()>,
}

impl<B: StoreBackend> DurableStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: MemoryStore::new(),
            degraded: AtomicBool::new(false),
            failures: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// True once any backend call has failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Number of backend failures absorbed so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Acquire)
    }

    /// Number of writes waiting for the backend.
    pub fn pending_writes(&self) -> usize {
        self.cache.len()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replays parked writes, then flushes the backend.
    pub fn flush(&self) {
        {
            let _guard = self.write_lock.lock();
            self.replay_locked();
        }
        if let Err(e) = self.backend.flush() {
            self.record_failure("flush", "", &e);
        }
    }

    fn record_failure(&self, op: &'static str, key: &str, err: &StoreError) {
        self.failures.fetch_add(1, Ordering::AcqRel);
        let was_degraded = self.degraded.swap(true, Ordering::AcqRel);
        tracing::warn!(
            target: "hive::store",
            op = op,
            key = key,
            error = %err,
            first_failure = !was_degraded,
            "backend failed; serving from volatile cache"
        );
    }

    /// Caller holds `write_lock`.
    fn set_locked(&self, key: &str, value: Value) {
        match self.backend.set(key, &value) {
            Ok(()) => {
                self.cache.remove(key);
                if !self.cache.is_empty() {
                    self.replay_locked();
                }
            }
            Err(e) => {
                self.record_failure("set", key, &e);
                self.cache.set(key, value);
            }
        }
    }

    /// Pushes parked writes to the backend in key order, stopping at the first failure.
    /// Caller holds `write_lock`.
    fn replay_locked(&self) {
        let parked = self.cache.keys("");
        if parked.is_empty() {
            return;
        }
        let mut replayed = 0usize;
        for key in parked {
            let Some(value) = self.cache.get(&key) else {
                continue;
            };
            if let Err(e) = self.backend.set(&key, &value) {
                self.record_failure("replay", &key, &e);
                break;
            }
            self.cache.remove(&key);
            replayed += 1;
        }
        tracing::info!(
            target: "hive::store",
            replayed = replayed,
            pending = self.cache.len(),
            "parked writes replayed"
        );
    }
}

impl<B: StoreBackend> KeyedStore for DurableStore<B> {
    fn get(&self, key: &str) -> Option<Value> {
        if let Some(v) = self.cache.get(key) {
            return Some(v);
        }
        match self.backend.get(key) {
            Ok(v) => v,
            Err(e) => {
                self.record_failure("get", key, &e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Value) {
        let _guard = self.write_lock.lock();
        self.set_locked(key, value);
    }

    fn merge(&self, key: &str, delta: Value) {
        let _guard = self.write_lock.lock();
        let merged = shallow_merge(self.get(key), delta);
        self.set_locked(key, merged);
    }

    fn keys(&self, prefix: &str) -> Vec<String> {
        let parked = self.cache.keys(prefix);
        match self.backend.keys(prefix) {
            Ok(keys) => {
                if parked.is_empty() {
                    return keys;
                }
                let mut all: BTreeSet<String> = keys.into_iter().collect();
                all.extend(parked);
                all.into_iter().collect()
            }
            Err(e) => {
                self.record_failure("keys", prefix, &e);
                parked
            }
        }
    }
}
