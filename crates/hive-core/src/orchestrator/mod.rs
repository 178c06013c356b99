//! Role orchestrator: routes open tasks to eligible sessions.
//!
//! Routing is greedy and single-shot: match the task's role hint (falling back to
//! [`Role::General`]), then pick the most recently seen candidate, ties broken by agent id.
//! It reserves no capacity; callers that need at-most-once allocation check the assignment
//! book first (see `HiveCore::allocate`).

use crate::board::{Artifact, ArtifactKind};
use crate::shared::{Clock, Role};
use crate::sessions::AgentSession;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Assigned,
    Accepted,
    InProgress,
    Done,
    Failed,
}

impl AssignmentStatus {
    /// Assigned, accepted, or in progress: the task is still held by its agent.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Assigned | Self::Accepted | Self::InProgress)
    }
}

/// Routing decision linking a task to a session and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_artifact_id: String,
    pub assigned_agent_id: String,
    pub assigned_role: Role,
    pub assigned_at_ms: i64,
    #[serde(default)]
    pub status: AssignmentStatus,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl TaskAssignment {
    /// Payload written into the Trail artifact that records this decision.
    pub fn trail_payload(&self) -> Map<String, Value> {
        let mut m = Map::new();
        m.insert("task_artifact_id".to_string(), json!(self.task_artifact_id));
        m.insert("assigned_agent_id".to_string(), json!(self.assigned_agent_id));
        m.insert("assigned_role".to_string(), json!(self.assigned_role));
        m
    }

    /// Rebuilds an assignment from a Trail artifact written at allocation time.
    pub fn from_trail(trail: &Artifact) -> Option<Self> {
        if trail.kind != ArtifactKind::Trail {
            return None;
        }
        let field = |k: &str| trail.payload.get(k).and_then(Value::as_str);
        Some(Self {
            task_artifact_id: field("task_artifact_id")?.to_string(),
            assigned_agent_id: field("assigned_agent_id")?.to_string(),
            assigned_role: Role::parse(field("assigned_role")?)?,
            assigned_at_ms: trail.created_at_ms,
            status: AssignmentStatus::Assigned,
            metadata: Map::new(),
        })
    }
}

/// Most recent heartbeat first; equal heartbeats by ascending agent id.
fn candidate_order(a: &&AgentSession, b: &&AgentSession) -> Ordering {
    b.last_seen_ms
        .cmp(&a.last_seen_ms)
        .then_with(|| a.agent_id.cmp(&b.agent_id))
}

pub struct RoleOrchestrator {
    assignments: DashMap<String, TaskAssignment>,
    clock: Arc<dyn Clock>,
}

impl RoleOrchestrator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            assignments: DashMap::new(),
            clock,
        }
    }

    /// Picks a session for `task` and records the assignment. `None` for non-task artifacts
    /// or when no session serves the role hint or the general role.
    pub fn route(&self, task: &Artifact, sessions: &[AgentSession]) -> Option<TaskAssignment> {
        if task.kind != ArtifactKind::Task {
            return None;
        }

        let role_hint = task.role_hint.unwrap_or(Role::General);
        let mut candidates: Vec<&AgentSession> = sessions
            .iter()
            .filter(|s| s.capabilities.serves(role_hint))
            .collect();
        if candidates.is_empty() {
            candidates = sessions
                .iter()
                .filter(|s| s.capabilities.serves(Role::General))
                .collect();
        }
        let chosen = candidates.into_iter().min_by(candidate_order)?;

        let assignment = TaskAssignment {
            task_artifact_id: task.artifact_id.clone(),
            assigned_agent_id: chosen.agent_id.clone(),
            assigned_role: role_hint,
            assigned_at_ms: self.clock.now_ms(),
            status: AssignmentStatus::Assigned,
            metadata: Map::new(),
        };
        self.assignments
            .insert(task.artifact_id.clone(), assignment.clone());
        tracing::info!(
            target: "hive::orchestrator",
            task_artifact_id = %task.artifact_id,
            agent_id = %chosen.agent_id,
            role = %role_hint,
            "task routed"
        );
        Some(assignment)
    }

    pub fn get_assignment(&self, task_artifact_id: &str) -> Option<TaskAssignment> {
        self.assignments.get(task_artifact_id).map(|a| a.clone())
    }

    /// Updates an assignment's status. Returns false if the task has no assignment.
    pub fn mark(&self, task_artifact_id: &str, status: AssignmentStatus) -> bool {
        match self.assignments.get_mut(task_artifact_id) {
            Some(mut a) => {
                a.status = status;
                true
            }
            None => false,
        }
    }

    /// Records an assignment directly, e.g. one rebuilt with [`TaskAssignment::from_trail`].
    pub fn restore(&self, assignment: TaskAssignment) {
        self.assignments
            .insert(assignment.task_artifact_id.clone(), assignment);
    }

    /// All assignments, sorted by task id.
    pub fn assignments(&self) -> Vec<TaskAssignment> {
        let mut out: Vec<TaskAssignment> =
            self.assignments.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.task_artifact_id.cmp(&b.task_artifact_id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::AgentCapabilities;
    use crate::shared::ManualClock;

    fn orchestrator() -> RoleOrchestrator {
        RoleOrchestrator::new(Arc::new(ManualClock::new(7)))
    }

    fn session(id: &str, roles: &[Role], last_seen_ms: i64) -> AgentSession {
        AgentSession {
            agent_id: id.to_string(),
            capabilities: AgentCapabilities::with_roles(roles.iter().copied()),
            connected_at_ms: 0,
            last_seen_ms,
            metadata: Map::new(),
        }
    }

    fn task(id: &str, role: Option<Role>) -> Artifact {
        Artifact::new(id, ArtifactKind::Task, 0).with_role_hint(role)
    }

    #[test]
    fn exact_role_beats_general_even_when_general_is_fresher() {
        let sessions = vec![
            session("gen", &[Role::General], 100),
            session("coder", &[Role::Coder], 1),
        ];
        let a = orchestrator().route(&task("t", Some(Role::Coder)), &sessions).unwrap();
        assert_eq!(a.assigned_agent_id, "coder");
        assert_eq!(a.assigned_role, Role::Coder);
        assert_eq!(a.assigned_at_ms, 7);
        assert_eq!(a.status, AssignmentStatus::Assigned);
    }

    #[test]
    fn falls_back_to_general_then_none() {
        let orch = orchestrator();
        let sessions = vec![
            session("tester", &[Role::Tester], 50),
            session("gen", &[Role::General], 1),
        ];
        let a = orch.route(&task("t", Some(Role::Designer)), &sessions).unwrap();
        assert_eq!(a.assigned_agent_id, "gen");

        let only_tester = vec![session("tester", &[Role::Tester], 50)];
        assert!(orch.route(&task("t2", Some(Role::Designer)), &only_tester).is_none());
        assert!(orch.route(&task("t3", None), &[]).is_none());
    }

    #[test]
    fn most_recent_heartbeat_wins_with_id_tiebreak() {
        let orch = orchestrator();
        let sessions = vec![
            session("b", &[Role::Ops], 10),
            session("a", &[Role::Ops], 10),
            session("c", &[Role::Ops], 5),
        ];
        let a = orch.route(&task("t", Some(Role::Ops)), &sessions).unwrap();
        assert_eq!(a.assigned_agent_id, "a");

        let sessions = vec![session("old", &[Role::Ops], 1), session("new", &[Role::Ops], 2)];
        let a = orch.route(&task("t", Some(Role::Ops)), &sessions).unwrap();
        assert_eq!(a.assigned_agent_id, "new");
    }

    #[test]
    fn missing_role_hint_routes_as_general() {
        let sessions = vec![session("gen", &[Role::General], 0)];
        let a = orchestrator().route(&task("t", None), &sessions).unwrap();
        assert_eq!(a.assigned_role, Role::General);
    }

    #[test]
    fn only_tasks_are_routed() {
        let sessions = vec![session("gen", &[Role::General], 0)];
        let result = Artifact::new("r", ArtifactKind::Result, 0);
        assert!(orchestrator().route(&result, &sessions).is_none());
    }

    #[test]
    fn assignment_book_tracks_status() {
        let orch = orchestrator();
        let sessions = vec![session("gen", &[Role::General], 0)];
        orch.route(&task("t", None), &sessions).unwrap();
        assert!(orch.mark("t", AssignmentStatus::InProgress));
        assert_eq!(orch.get_assignment("t").unwrap().status, AssignmentStatus::InProgress);
        assert!(!orch.mark("unknown", AssignmentStatus::Done));
        assert_eq!(orch.assignments().len(), 1);
        assert!(AssignmentStatus::Accepted.is_active());
        assert!(!AssignmentStatus::Failed.is_active());
    }

    #[test]
    fn assignment_round_trips_through_trail() {
        let orch = orchestrator();
        let sessions = vec![session("coder", &[Role::Coder], 0)];
        let a = orch.route(&task("t", Some(Role::Coder)), &sessions).unwrap();
        let trail = Artifact::new("assign_1", ArtifactKind::Trail, a.assigned_at_ms)
            .with_payload(a.trail_payload());
        let rebuilt = TaskAssignment::from_trail(&trail).unwrap();
        assert_eq!(rebuilt, a);

        let not_trail = Artifact::new("x", ArtifactKind::Vote, 0).with_payload(a.trail_payload());
        assert!(TaskAssignment::from_trail(&not_trail).is_none());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn arb_role() -> impl Strategy<Value = Role> {
            proptest::sample::select(Role::all().to_vec())
        }

        proptest! {
            #[test]
            fn route_respects_role_eligibility(
                wanted in arb_role(),
                pool in proptest::collection::vec(
                    (proptest::collection::vec(arb_role(), 1..3), 0i64..5),
                    0..8,
                ),
            ) {
                let sessions: Vec<AgentSession> = pool
                    .iter()
                    .enumerate()
                    .map(|(i, (roles, seen))| session(&format!("s{}", i), roles, *seen))
                    .collect();
                let exact = sessions.iter().any(|s| s.capabilities.serves(wanted));
                let general = sessions.iter().any(|s| s.capabilities.serves(Role::General));

                match orchestrator().route(&task("t", Some(wanted)), &sessions) {
                    Some(a) => {
                        let chosen = sessions
                            .iter()
                            .find(|s| s.agent_id == a.assigned_agent_id)
                            .unwrap();
                        if exact {
                            prop_assert!(chosen.capabilities.serves(wanted));
                        } else {
                            prop_assert!(chosen.capabilities.serves(Role::General));
                        }
                    }
                    None => prop_assert!(!exact && !general),
                }
            }
        }
    }
}
