//! Session registry: connected agents and their declared capabilities.
//!
//! Sessions are volatile. Each session sits behind its own map shard lock, so a heartbeat's
//! read-modify-write of `last_seen_ms` is atomic per agent.

use crate::shared::{new_id, Clock, Role};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// What an agent can serve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// Ordered set: first occurrence wins, duplicates are dropped.
    pub roles: Vec<Role>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: u32,
    #[serde(default = "default_latency_budget")]
    pub latency_budget_ms: u64,
}

fn default_concurrency() -> u32 {
    1
}

fn default_latency_budget() -> u64 {
    100
}

impl Default for AgentCapabilities {
    fn default() -> Self {
        Self {
            roles: vec![Role::General],
            tags: Vec::new(),
            max_concurrency: default_concurrency(),
            latency_budget_ms: default_latency_budget(),
        }
    }
}

impl AgentCapabilities {
    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut out: Vec<Role> = Vec::new();
        for r in roles {
            if !out.contains(&r) {
                out.push(r);
            }
        }
        Self {
            roles: out,
            ..Self::default()
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_concurrency(mut self, max_concurrency: u32) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_latency_budget_ms(mut self, budget_ms: u64) -> Self {
        self.latency_budget_ms = budget_ms;
        self
    }

    pub fn serves(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// A connected worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSession {
    pub agent_id: String,
    pub capabilities: AgentCapabilities,
    pub connected_at_ms: i64,
    pub last_seen_ms: i64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

pub struct SessionRegistry {
    sessions: DashMap<String, AgentSession>,
    clock: Arc<dyn Clock>,
}

impl SessionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Registers an agent. A missing or empty id is generated (`agent_<hex>`);
    /// reconnecting with a known id replaces the old session.
    pub fn connect(
        &self,
        agent_id: Option<&str>,
        capabilities: AgentCapabilities,
        metadata: Option<Map<String, Value>>,
    ) -> AgentSession {
        let agent_id = agent_id
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| new_id("agent"));
        let now = self.clock.now_ms();
        let capabilities = AgentCapabilities::with_roles(capabilities.roles.iter().copied())
            .with_tags(capabilities.tags)
            .with_concurrency(capabilities.max_concurrency)
            .with_latency_budget_ms(capabilities.latency_budget_ms);
        let session = AgentSession {
            agent_id: agent_id.clone(),
            capabilities,
            connected_at_ms: now,
            last_seen_ms: now,
            metadata: metadata.unwrap_or_default(),
        };
        let replaced = self.sessions.insert(agent_id.clone(), session.clone()).is_some();
        tracing::info!(
            target: "hive::sessions",
            agent_id = %agent_id,
            roles = ?session.capabilities.roles,
            replaced = replaced,
            "agent connected"
        );
        session
    }

    /// Refreshes `last_seen_ms`. Returns false for unknown agents.
    pub fn heartbeat(&self, agent_id: &str) -> bool {
        match self.sessions.get_mut(agent_id) {
            Some(mut s) => {
                s.last_seen_ms = self.clock.now_ms();
                true
            }
            None => false,
        }
    }

    pub fn disconnect(&self, agent_id: &str) -> Option<AgentSession> {
        let removed = self.sessions.remove(agent_id).map(|(_, s)| s);
        if removed.is_some() {
            tracing::info!(target: "hive::sessions", agent_id = agent_id, "agent disconnected");
        }
        removed
    }

    pub fn get(&self, agent_id: &str) -> Option<AgentSession> {
        self.sessions.get(agent_id).map(|s| s.clone())
    }

    /// Snapshot of all sessions, sorted by agent id.
    pub fn sessions(&self) -> Vec<AgentSession> {
        let mut out: Vec<AgentSession> = self.sessions.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
