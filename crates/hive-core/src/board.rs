//! Stigmergy board: the shared blackboard agents read from and write to.
//!
//! Artifacts live under `artifact:<id>`. Expiry is evaluated at read time; expired artifacts
//! read as absent but stay in the store. `post` and `reinforce` share one board lock, and
//! `reinforce` holds it across its whole get/modify/set so concurrent reinforcements of the
//! same artifact never lose updates.

use crate::shared::{Clock, Priority, Role, ARTIFACT_PREFIX, GOAL_INDEX_PREFIX};
use crate::store::{self, KeyedStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// Payload key holding the append-only reinforcement history.
pub const REINFORCEMENT_LOG_KEY: &str = "reinforcement_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Task,
    Proposal,
    Evidence,
    Result,
    Vote,
    Observation,
    Trail,
}

fn default_confidence() -> f64 {
    0.5
}

/// A unit posted to the shared blackboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub artifact_id: String,
    pub kind: ArtifactKind,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    #[serde(default)]
    pub author_agent_id: Option<String>,
    /// Capability this artifact targets.
    #[serde(default)]
    pub role_hint: Option<Role>,

    #[serde(default)]
    pub priority: Priority,
    /// Reinforcement signal. Never negative.
    #[serde(default)]
    pub pheromone_strength: f64,
    /// Writer's certainty in [0.0, 1.0].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub ttl_ms: Option<i64>,

    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Artifact {
    /// Creates an artifact with both timestamps at `now_ms` and reference defaults
    /// (medium priority, zero pheromone, confidence 0.5, no TTL).
    pub fn new(artifact_id: impl Into<String>, kind: ArtifactKind, now_ms: i64) -> Self {
        Self {
            artifact_id: artifact_id.into(),
            kind,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
            author_agent_id: None,
            role_hint: None,
            priority: Priority::Medium,
            pheromone_strength: 0.0,
            confidence: default_confidence(),
            ttl_ms: None,
            title: String::new(),
            payload: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_author(mut self, agent_id: impl Into<String>) -> Self {
        self.author_agent_id = Some(agent_id.into());
        self
    }

    pub fn with_role_hint(mut self, role: Option<Role>) -> Self {
        self.role_hint = role;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_pheromone(mut self, strength: f64) -> Self {
        self.pheromone_strength = strength.max(0.0);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }

    pub fn with_payload(mut self, payload: Map<String, Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Expired once strictly more than `ttl_ms` has elapsed since creation.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        match self.ttl_ms {
            Some(ttl) => now_ms.saturating_sub(self.created_at_ms) > ttl,
            None => false,
        }
    }

    /// Goal this artifact is linked to through its payload, if any.
    pub fn goal_id(&self) -> Option<&str> {
        self.payload.get("goal_id").and_then(Value::as_str)
    }

    /// Entries appended by [`StigmergyBoard::reinforce`].
    pub fn reinforcement_log(&self) -> &[Value] {
        self.payload
            .get(REINFORCEMENT_LOG_KEY)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn store_key(artifact_id: &str) -> String {
        format!("{}{}", ARTIFACT_PREFIX, artifact_id)
    }
}

/// Board ordering: priority, then pheromone, then recency (all descending), then id ascending.
pub fn board_order(a: &Artifact, b: &Artifact) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| b.pheromone_strength.total_cmp(&a.pheromone_strength))
        .then_with(|| b.updated_at_ms.cmp(&a.updated_at_ms))
        .then_with(|| a.artifact_id.cmp(&b.artifact_id))
}

fn goal_index_key(goal_id: &str, artifact_id: &str) -> String {
    format!("{}{}:{}", GOAL_INDEX_PREFIX, goal_id, artifact_id)
}

/// Shared blackboard over a keyed store.
pub struct StigmergyBoard {
    store: Arc<dyn KeyedStore>,
    clock: Arc<dyn Clock>,
    goal_index: bool,
    lock: Mutex<()>,
}

impl StigmergyBoard {
    pub fn new(store: Arc<dyn KeyedStore>, clock: Arc<dyn Clock>, goal_index: bool) -> Self {
        Self {
            store,
            clock,
            goal_index,
            lock: Mutex::new(()),
        }
    }

    /// Upserts the artifact by id and stamps `updated_at_ms`. Returns what was stored.
    pub fn post(&self, artifact: Artifact) -> Artifact {
        let _guard = self.lock.lock();
        self.post_locked(artifact)
    }

    fn post_locked(&self, mut artifact: Artifact) -> Artifact {
        artifact.updated_at_ms = self.clock.now_ms();
        let key = Artifact::store_key(&artifact.artifact_id);
        if store::save(self.store.as_ref(), &key, &artifact) {
            if self.goal_index {
                if let Some(goal_id) = artifact.goal_id() {
                    self.store.set(
                        &goal_index_key(goal_id, &artifact.artifact_id),
                        Value::String(artifact.artifact_id.clone()),
                    );
                }
            }
            tracing::debug!(
                target: "hive::board",
                artifact_id = %artifact.artifact_id,
                kind = ?artifact.kind,
                "artifact posted"
            );
        }
        artifact
    }

    /// Returns the artifact unless it is missing, malformed, or expired.
    pub fn get(&self, artifact_id: &str) -> Option<Artifact> {
        let key = Artifact::store_key(artifact_id);
        let art: Artifact = store::load(self.store.as_ref(), "artifact", &key)?;
        if art.is_expired(self.clock.now_ms()) {
            return None;
        }
        Some(art)
    }

    /// Live artifacts matching the optional filters, in [`board_order`].
    pub fn list(&self, kind: Option<ArtifactKind>, role_hint: Option<Role>) -> Vec<Artifact> {
        let now = self.clock.now_ms();
        let mut artifacts: Vec<Artifact> = self
            .store
            .keys(ARTIFACT_PREFIX)
            .into_iter()
            .filter_map(|k| store::load::<Artifact>(self.store.as_ref(), "artifact", &k))
            .filter(|a| !a.is_expired(now))
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .filter(|a| role_hint.map_or(true, |r| a.role_hint == Some(r)))
            .collect();
        artifacts.sort_by(board_order);
        artifacts
    }

    /// Number of live artifacts.
    pub fn len(&self) -> usize {
        self.list(None, None).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds `delta` to pheromone strength (floored at 0) and appends a log entry.
    /// Returns the updated artifact, or `None` when it is absent or expired.
    pub fn reinforce(&self, artifact_id: &str, delta: f64, reason: &str) -> Option<Artifact> {
        let delta = if delta.is_finite() {
            delta
        } else {
            tracing::warn!(
                target: "hive::board",
                artifact_id = artifact_id,
                "non-finite delta treated as 0"
            );
            0.0
        };

        let _guard = self.lock.lock();
        let mut art = self.get(artifact_id)?;
        art.pheromone_strength = (art.pheromone_strength + delta).max(0.0);
        let entry = json!({ "t_ms": self.clock.now_ms(), "delta": delta, "reason": reason });
        match art.payload.get_mut(REINFORCEMENT_LOG_KEY) {
            Some(Value::Array(log)) => log.push(entry),
            _ => {
                art.payload
                    .insert(REINFORCEMENT_LOG_KEY.to_string(), Value::Array(vec![entry]));
            }
        }
        tracing::debug!(
            target: "hive::board",
            artifact_id = artifact_id,
            delta = delta,
            pheromone = art.pheromone_strength,
            "artifact reinforced"
        );
        Some(self.post_locked(art))
    }

    /// Live artifacts whose payload carries `goal_id`, in [`board_order`].
    ///
    /// Uses the goal index when enabled; stale index entries are re-checked and skipped.
    pub fn artifacts_for_goal(&self, goal_id: &str) -> Vec<Artifact> {
        if !self.goal_index {
            return self
                .list(None, None)
                .into_iter()
                .filter(|a| a.goal_id() == Some(goal_id))
                .collect();
        }

        let prefix = format!("{}{}:", GOAL_INDEX_PREFIX, goal_id);
        let mut artifacts: Vec<Artifact> = self
            .store
            .keys(&prefix)
            .iter()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|artifact_id| self.get(artifact_id))
            .filter(|a| a.goal_id() == Some(goal_id))
            .collect();
        artifacts.sort_by(board_order);
        artifacts
    }
}
