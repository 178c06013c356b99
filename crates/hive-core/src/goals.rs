//! Goal hierarchy: persistent objectives and their subgoals.
//!
//! A goal's parent is fixed at creation and must already exist, so the tree stays acyclic and
//! every child is listed exactly once by its parent. One lock covers each read-modify-write.

use crate::error::{HiveError, HiveResult};
use crate::shared::{new_id, Clock, Priority, GOAL_PREFIX};
use crate::store::{self, KeyedStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    #[default]
    Open,
    InProgress,
    Blocked,
    Done,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Done => "done",
        }
    }

    /// Guarded lifecycle used by [`GoalHierarchy::transition`]. `done` is terminal.
    pub fn can_transition_to(&self, next: GoalStatus) -> bool {
        use GoalStatus::*;
        matches!(
            (self, next),
            (Open, InProgress | Blocked | Done)
                | (InProgress, Blocked | Done)
                | (Blocked, InProgress | Open)
        )
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the objective tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalNode {
    pub goal_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_goal_id: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: GoalStatus,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl GoalNode {
    fn store_key(goal_id: &str) -> String {
        format!("{}{}", GOAL_PREFIX, goal_id)
    }
}

pub struct GoalHierarchy {
    store: Arc<dyn KeyedStore>,
    clock: Arc<dyn Clock>,
    lock: Mutex<()>,
}

impl GoalHierarchy {
    pub fn new(store: Arc<dyn KeyedStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            lock: Mutex::new(()),
        }
    }

    /// Creates a top-level goal.
    pub fn create_root(&self, title: &str, description: &str, priority: Priority) -> GoalNode {
        let _guard = self.lock.lock();
        self.insert(title, description, None, priority)
    }

    /// Creates a goal, linking it under `parent_goal_id` when given.
    /// Returns `None` (and stores nothing) if the parent does not exist.
    pub fn create_goal(
        &self,
        title: &str,
        description: &str,
        parent_goal_id: Option<&str>,
        priority: Priority,
    ) -> Option<GoalNode> {
        let _guard = self.lock.lock();
        let parent = match parent_goal_id {
            Some(pid) => match self.get(pid) {
                Some(p) => Some(p),
                None => {
                    tracing::warn!(
                        target: "hive::goals",
                        parent_goal_id = pid,
                        "parent goal not found"
                    );
                    return None;
                }
            },
            None => None,
        };
        Some(self.insert(title, description, parent, priority))
    }

    /// Caller holds `self.lock`.
    fn insert(
        &self,
        title: &str,
        description: &str,
        parent: Option<GoalNode>,
        priority: Priority,
    ) -> GoalNode {
        let now = self.clock.now_ms();
        let goal = GoalNode {
            goal_id: new_id("goal"),
            title: title.to_string(),
            description: description.to_string(),
            parent_goal_id: parent.as_ref().map(|p| p.goal_id.clone()),
            priority,
            status: GoalStatus::Open,
            created_at_ms: now,
            updated_at_ms: now,
            children: Vec::new(),
            metadata: Map::new(),
        };
        self.put(&goal);

        if let Some(mut parent) = parent {
            if !parent.children.contains(&goal.goal_id) {
                parent.children.push(goal.goal_id.clone());
                parent.updated_at_ms = now;
                self.put(&parent);
            }
        }
        tracing::info!(
            target: "hive::goals",
            goal_id = %goal.goal_id,
            parent_goal_id = ?goal.parent_goal_id,
            "goal created"
        );
        goal
    }

    pub fn get(&self, goal_id: &str) -> Option<GoalNode> {
        store::load(self.store.as_ref(), "goal", &GoalNode::store_key(goal_id))
    }

    /// Sets status unconditionally. Returns the updated goal, or `None` if unknown.
    pub fn mark(&self, goal_id: &str, status: GoalStatus) -> Option<GoalNode> {
        let _guard = self.lock.lock();
        let mut goal = self.get(goal_id)?;
        goal.status = status;
        goal.updated_at_ms = self.clock.now_ms();
        self.put(&goal);
        tracing::info!(target: "hive::goals", goal_id = goal_id, status = %status, "goal marked");
        Some(goal)
    }

    /// Guarded status change: rejects moves [`GoalStatus::can_transition_to`] disallows.
    /// Moving to the current status is a no-op.
    pub fn transition(&self, goal_id: &str, status: GoalStatus) -> HiveResult<GoalNode> {
        let _guard = self.lock.lock();
        let mut goal = self
            .get(goal_id)
            .ok_or_else(|| HiveError::GoalNotFound(goal_id.to_string()))?;
        if goal.status == status {
            return Ok(goal);
        }
        if !goal.status.can_transition_to(status) {
            return Err(HiveError::InvalidTransition {
                goal_id: goal_id.to_string(),
                from: goal.status,
                to: status,
            });
        }
        goal.status = status;
        goal.updated_at_ms = self.clock.now_ms();
        self.put(&goal);
        Ok(goal)
    }

    /// Direct children in insertion order.
    pub fn children(&self, goal_id: &str) -> Vec<GoalNode> {
        self.get(goal_id)
            .map(|g| g.children.iter().filter_map(|c| self.get(c)).collect())
            .unwrap_or_default()
    }

    /// All goals, oldest first (ties by id).
    pub fn list(&self) -> Vec<GoalNode> {
        let mut goals: Vec<GoalNode> = self
            .store
            .keys(GOAL_PREFIX)
            .into_iter()
            .filter_map(|k| store::load(self.store.as_ref(), "goal", &k))
            .collect();
        goals.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.goal_id.cmp(&b.goal_id))
        });
        goals
    }

    fn put(&self, goal: &GoalNode) {
        store::save(
            self.store.as_ref(),
            &GoalNode::store_key(&goal.goal_id),
            goal,
        );
    }
}
