//! Hive core: the facade agents and tool layers call.
//!
//! Swarm cycle: ingest a goal, decompose it into tasks on the board, allocate each task to a
//! session, let agents post results, reinforce those results, and check goal convergence.

use crate::board::{Artifact, ArtifactKind, StigmergyBoard};
use crate::emergence::{EmergenceEngine, EmergenceScore};
use crate::error::HiveResult;
use crate::goals::{GoalHierarchy, GoalNode, GoalStatus};
use crate::memory::{CollectiveMemory, MemoryRecord};
use crate::observation::{ObservationBus, ObservationEvent};
use crate::orchestrator::{AssignmentStatus, RoleOrchestrator, TaskAssignment};
use crate::sessions::{AgentCapabilities, AgentSession, SessionRegistry};
use crate::shared::{new_id, Clock, HiveConfig, Priority, Role, SystemClock};
use crate::store::{open_store, KeyedStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Row returned by [`HiveCore::read_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStatusView {
    pub goal_id: String,
    pub title: String,
    pub status: GoalStatus,
}

pub struct HiveCore {
    config: HiveConfig,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyedStore>,
    sessions: SessionRegistry,
    board: StigmergyBoard,
    goals: GoalHierarchy,
    memory: CollectiveMemory,
    observations: ObservationBus,
    orchestrator: RoleOrchestrator,
    emergence: EmergenceEngine,
    /// Held across the assignment check and the route in `allocate`.
    allocation: Mutex<()>,
}

impl HiveCore {
    pub fn new(store: Arc<dyn KeyedStore>, config: HiveConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Builds a core over `store`. Live Trail artifacts already on the board are read back into
    /// the assignment book, so `allocate` stays idempotent across restarts.
    pub fn with_clock(
        store: Arc<dyn KeyedStore>,
        config: HiveConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let hive = Self {
            sessions: SessionRegistry::new(Arc::clone(&clock)),
            board: StigmergyBoard::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                config.board.goal_index,
            ),
            goals: GoalHierarchy::new(Arc::clone(&store), Arc::clone(&clock)),
            memory: CollectiveMemory::new(Arc::clone(&store), Arc::clone(&clock)),
            observations: ObservationBus::new(Arc::clone(&clock)),
            orchestrator: RoleOrchestrator::new(Arc::clone(&clock)),
            emergence: EmergenceEngine::new(config.emergence.clone(), Arc::clone(&clock)),
            allocation: Mutex::new(()),
            config,
            clock,
            store,
        };
        hive.restore_assignments();
        hive
    }

    /// Rebuilds assignments from live trails. The newest trail per task wins; an assignment
    /// whose agent already posted a result for the task comes back as `done`.
    fn restore_assignments(&self) -> usize {
        let mut latest: HashMap<String, TaskAssignment> = HashMap::new();
        for trail in self.board.list(Some(ArtifactKind::Trail), None) {
            let Some(a) = TaskAssignment::from_trail(&trail) else {
                continue;
            };
            match latest.get(&a.task_artifact_id) {
                Some(prev) if prev.assigned_at_ms >= a.assigned_at_ms => {}
                _ => {
                    latest.insert(a.task_artifact_id.clone(), a);
                }
            }
        }
        if latest.is_empty() {
            return 0;
        }

        let answered: HashSet<(String, String)> = self
            .board
            .list(None, None)
            .into_iter()
            .filter(|a| !matches!(a.kind, ArtifactKind::Task | ArtifactKind::Trail))
            .filter_map(|a| {
                let task_id = a.payload.get("task_artifact_id")?.as_str()?.to_string();
                Some((task_id, a.author_agent_id?))
            })
            .collect();

        let restored = latest.len();
        for (task_id, mut a) in latest {
            if answered.contains(&(task_id, a.assigned_agent_id.clone())) {
                a.status = AssignmentStatus::Done;
            }
            self.orchestrator.restore(a);
        }
        tracing::info!(
            target: "hive::core",
            restored = restored,
            "assignments restored from trails"
        );
        restored
    }

    /// Opens the configured store and builds a core over it.
    pub fn open(config: HiveConfig) -> HiveResult<Self> {
        let store = open_store(&config.storage)?;
        tracing::info!(
            target: "hive::core",
            backend = %config.storage.backend,
            "hive core opened"
        );
        Ok(Self::new(store, config))
    }

    // ---------------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------------

    pub fn connect(&self, agent_id: Option<&str>, capabilities: AgentCapabilities) -> AgentSession {
        self.sessions.connect(agent_id, capabilities, None)
    }

    pub fn heartbeat(&self, agent_id: &str) -> bool {
        self.sessions.heartbeat(agent_id)
    }

    pub fn disconnect(&self, agent_id: &str) -> Option<AgentSession> {
        self.sessions.disconnect(agent_id)
    }

    // ---------------------------------------------------------------------
    // Swarm cycle
    // ---------------------------------------------------------------------

    /// Posts a top-level goal.
    pub fn ingest_goal(&self, title: &str, description: &str, priority: Priority) -> GoalNode {
        let goal = self.goals.create_root(title, description, priority);
        tracing::info!(
            target: "hive::core",
            goal_id = %goal.goal_id,
            title = title,
            "goal ingested"
        );
        goal
    }

    /// Posts a Task artifact linked to `goal` through its payload's `goal_id`.
    pub fn decompose_to_task(
        &self,
        goal: &GoalNode,
        title: &str,
        role_hint: Role,
        payload: Option<Map<String, Value>>,
        priority: Option<Priority>,
    ) -> Artifact {
        let mut body = Map::new();
        body.insert("goal_id".to_string(), json!(goal.goal_id));
        body.extend(payload.unwrap_or_default());

        let task = Artifact::new(new_id("task"), ArtifactKind::Task, self.clock.now_ms())
            .with_title(title)
            .with_role_hint(Some(role_hint))
            .with_priority(priority.unwrap_or(self.config.goals.default_priority))
            .with_pheromone(self.config.board.initial_pheromone)
            .with_confidence(self.config.board.task_confidence)
            .with_payload(body);
        self.board.post(task)
    }

    /// Routes a task to a session and records the decision as a short-lived Trail.
    ///
    /// A task whose current assignment is still active gets that assignment back
    /// instead of a second routing.
    pub fn allocate(&self, task_artifact_id: &str) -> Option<TaskAssignment> {
        let _guard = self.allocation.lock();
        let task = self.board.get(task_artifact_id)?;

        if let Some(existing) = self.orchestrator.get_assignment(task_artifact_id) {
            if existing.status.is_active() {
                tracing::debug!(
                    target: "hive::core",
                    task_artifact_id = task_artifact_id,
                    agent_id = %existing.assigned_agent_id,
                    "task already allocated"
                );
                return Some(existing);
            }
        }

        let assignment = self.orchestrator.route(&task, &self.sessions.sessions())?;
        let trail = Artifact::new(new_id("assign"), ArtifactKind::Trail, self.clock.now_ms())
            .with_title(format!("Assignment for {}", task.artifact_id))
            .with_role_hint(Some(assignment.assigned_role))
            .with_priority(task.priority)
            .with_pheromone(task.pheromone_strength)
            .with_confidence(self.config.board.trail_confidence)
            .with_ttl_ms(self.config.board.trail_ttl_ms)
            .with_payload(assignment.trail_payload());
        self.board.post(trail);
        Some(assignment)
    }

    /// Posts an agent's output for a task. Role hint, priority and goal link are inherited
    /// from the task when it is still on the board.
    pub fn post_result(
        &self,
        agent_id: &str,
        task_artifact_id: &str,
        kind: ArtifactKind,
        title: &str,
        payload: Map<String, Value>,
        confidence: Option<f64>,
    ) -> Artifact {
        self.sessions.heartbeat(agent_id);

        let task = self.board.get(task_artifact_id);
        let role_hint = task.as_ref().and_then(|t| t.role_hint);
        let priority = task.as_ref().map_or(Priority::Medium, |t| t.priority);

        let mut body = Map::new();
        body.insert("task_artifact_id".to_string(), json!(task_artifact_id));
        body.extend(payload);
        if !body.contains_key("goal_id") {
            if let Some(goal_id) = task.as_ref().and_then(Artifact::goal_id) {
                body.insert("goal_id".to_string(), json!(goal_id));
            }
        }

        let result = Artifact::new(new_id("art"), kind, self.clock.now_ms())
            .with_author(agent_id)
            .with_role_hint(role_hint)
            .with_priority(priority)
            .with_pheromone(self.config.board.initial_pheromone)
            .with_confidence(confidence.unwrap_or(self.config.board.default_result_confidence))
            .with_title(title)
            .with_payload(body);
        let result = self.board.post(result);

        if let Some(a) = self.orchestrator.get_assignment(task_artifact_id) {
            if a.assigned_agent_id == agent_id {
                self.orchestrator.mark(task_artifact_id, AssignmentStatus::Done);
            }
        }
        tracing::info!(
            target: "hive::core",
            agent_id = agent_id,
            task_artifact_id = task_artifact_id,
            artifact_id = %result.artifact_id,
            "result posted"
        );
        result
    }

    /// Scores an artifact and reinforces it by `max(0, score) * reinforcement_gain`.
    /// Missing artifacts yield a zero score with reason `artifact_not_found`.
    pub fn reinforce(&self, artifact_id: &str) -> EmergenceScore {
        let Some(art) = self.board.get(artifact_id) else {
            return self.emergence.not_found(artifact_id);
        };
        let score = self.emergence.score_outcome(&art);
        let delta = self.emergence.reinforcement_delta(&score);
        if self.board.reinforce(artifact_id, delta, &score.reason).is_none() {
            tracing::warn!(
                target: "hive::core",
                artifact_id = artifact_id,
                "artifact vanished before reinforcement"
            );
        }
        score
    }

    /// Marks the goal done once the pheromone on its linked artifacts reaches `threshold`.
    pub fn converge_goal(&self, goal_id: &str, threshold: f64) -> bool {
        if self.goals.get(goal_id).is_none() {
            tracing::warn!(
                target: "hive::core",
                goal_id = goal_id,
                "convergence check on unknown goal"
            );
            return false;
        }
        let total: f64 = self
            .board
            .artifacts_for_goal(goal_id)
            .iter()
            .map(|a| a.pheromone_strength)
            .sum();
        if total >= threshold {
            self.goals.mark(goal_id, GoalStatus::Done);
            tracing::info!(
                target: "hive::core",
                goal_id = goal_id,
                total = total,
                threshold = threshold,
                "goal converged"
            );
            return true;
        }
        tracing::debug!(
            target: "hive::core",
            goal_id = goal_id,
            total = total,
            threshold = threshold,
            "goal not converged"
        );
        false
    }

    /// Goals whose title contains `query` (case-insensitive); all goals when `None`.
    pub fn read_status(&self, query: Option<&str>) -> Vec<GoalStatusView> {
        let needle = query.map(str::to_lowercase);
        self.goals
            .list()
            .into_iter()
            .filter(|g| {
                needle
                    .as_deref()
                    .map_or(true, |q| g.title.to_lowercase().contains(q))
            })
            .map(|g| GoalStatusView {
                goal_id: g.goal_id,
                title: g.title,
                status: g.status,
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Memory and observations
    // ---------------------------------------------------------------------

    pub fn remember(
        &self,
        namespace: &str,
        key: &str,
        value: Value,
        provenance: Option<Map<String, Value>>,
    ) -> MemoryRecord {
        self.memory.write(namespace, key, value, provenance)
    }

    pub fn recall(&self, namespace: &str, key: &str) -> Option<MemoryRecord> {
        self.memory.read(namespace, key)
    }

    pub fn publish_observation(
        &self,
        topic: &str,
        payload: Map<String, Value>,
        role_targets: &[Role],
    ) -> String {
        self.observations.publish(topic, payload, role_targets)
    }

    pub fn poll_observations(&self, role: Role, max_events: usize) -> Vec<ObservationEvent> {
        self.observations.poll(role, max_events)
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &HiveConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyedStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn board(&self) -> &StigmergyBoard {
        &self.board
    }

    pub fn goals(&self) -> &GoalHierarchy {
        &self.goals
    }

    pub fn memory(&self) -> &CollectiveMemory {
        &self.memory
    }

    pub fn observations(&self) -> &ObservationBus {
        &self.observations
    }

    pub fn orchestrator(&self) -> &RoleOrchestrator {
        &self.orchestrator
    }

    pub fn emergence(&self) -> &EmergenceEngine {
        &self.emergence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ManualClock;
    use crate::store::MemoryStore;

    fn hive() -> (HiveCore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let hive = HiveCore::with_clock(
            Arc::new(MemoryStore::new()),
            HiveConfig::default(),
            clock.clone(),
        );
        (hive, clock)
    }

    fn map(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    fn post_linked(hive: &HiveCore, id: &str, goal_id: &str, pheromone: f64) {
        hive.board().post(
            Artifact::new(id, ArtifactKind::Result, 0)
                .with_pheromone(pheromone)
                .with_payload(map(json!({ "goal_id": goal_id }))),
        );
    }

    #[test]
    fn decompose_links_task_to_goal() {
        let (hive, _) = hive();
        let goal = hive.ingest_goal("Ship MVP", "thin slice", Priority::Critical);
        let task = hive.decompose_to_task(
            &goal,
            "Collect market evidence",
            Role::Researcher,
            Some(map(json!({"deliverable": "market_brief"}))),
            None,
        );
        assert!(task.artifact_id.starts_with("task_"));
        assert_eq!(task.kind, ArtifactKind::Task);
        assert_eq!(task.goal_id(), Some(goal.goal_id.as_str()));
        assert_eq!(task.payload["deliverable"], "market_brief");
        assert_eq!(task.priority, Priority::High);
        assert!((task.pheromone_strength - 0.1).abs() < 1e-9);
        assert!((task.confidence - 0.6).abs() < 1e-9);
        assert_eq!(hive.board().get(&task.artifact_id), Some(task));
    }

    #[test]
    fn allocate_posts_expiring_trail() {
        let (hive, clock) = hive();
        let agent = hive.connect(Some("coder-1"), AgentCapabilities::with_roles([Role::Coder]));
        let goal = hive.ingest_goal("g", "", Priority::High);
        let task = hive.decompose_to_task(&goal, "impl", Role::Coder, None, None);

        let a = hive.allocate(&task.artifact_id).unwrap();
        assert_eq!(a.assigned_agent_id, agent.agent_id);

        let trails = hive.board().list(Some(ArtifactKind::Trail), None);
        assert_eq!(trails.len(), 1);
        assert_eq!(trails[0].ttl_ms, Some(60_000));
        assert_eq!(TaskAssignment::from_trail(&trails[0]).unwrap().assigned_agent_id, "coder-1");

        clock.advance(60_001);
        assert!(hive.board().list(Some(ArtifactKind::Trail), None).is_empty());
    }

    #[test]
    fn allocate_is_idempotent_while_assignment_active() {
        let (hive, clock) = hive();
        hive.connect(Some("a"), AgentCapabilities::default());
        let goal = hive.ingest_goal("g", "", Priority::High);
        let task = hive.decompose_to_task(&goal, "t", Role::General, None, None);

        let first = hive.allocate(&task.artifact_id).unwrap();
        clock.advance(1);
        hive.connect(Some("b"), AgentCapabilities::default());
        let second = hive.allocate(&task.artifact_id).unwrap();
        assert_eq!(first, second);
        assert_eq!(hive.board().list(Some(ArtifactKind::Trail), None).len(), 1);

        hive.orchestrator().mark(&task.artifact_id, AssignmentStatus::Failed);
        let third = hive.allocate(&task.artifact_id).unwrap();
        assert_eq!(third.assigned_agent_id, "b");
    }

    #[test]
    fn assignments_are_rebuilt_from_live_trails() {
        let clock = Arc::new(ManualClock::new(0));
        let store: Arc<dyn KeyedStore> = Arc::new(MemoryStore::new());
        let (open, answered, expired) = {
            let hive =
                HiveCore::with_clock(Arc::clone(&store), HiveConfig::default(), clock.clone());
            hive.connect(Some("c1"), AgentCapabilities::with_roles([Role::Coder]));
            let goal = hive.ingest_goal("g", "", Priority::High);
            let open = hive.decompose_to_task(&goal, "open", Role::Coder, None, None);
            let answered = hive.decompose_to_task(&goal, "answered", Role::Coder, None, None);
            let expired = hive.decompose_to_task(&goal, "expired", Role::Coder, None, None);
            hive.allocate(&expired.artifact_id).unwrap();
            clock.advance(30_000);
            hive.allocate(&open.artifact_id).unwrap();
            hive.allocate(&answered.artifact_id).unwrap();
            let id = &answered.artifact_id;
            hive.post_result("c1", id, ArtifactKind::Result, "r", Map::new(), None);
            (open.artifact_id, answered.artifact_id, expired.artifact_id)
        };
        clock.advance(30_001);

        let hive = HiveCore::with_clock(store, HiveConfig::default(), clock.clone());
        let restored = hive.orchestrator().get_assignment(&open).unwrap();
        assert_eq!(restored.assigned_agent_id, "c1");
        assert_eq!(restored.status, AssignmentStatus::Assigned);
        assert_eq!(
            hive.orchestrator().get_assignment(&answered).unwrap().status,
            AssignmentStatus::Done
        );
        assert!(hive.orchestrator().get_assignment(&expired).is_none());

        hive.connect(Some("c2"), AgentCapabilities::with_roles([Role::Coder]));
        assert_eq!(hive.allocate(&open).unwrap().assigned_agent_id, "c1");
        assert_eq!(hive.allocate(&answered).unwrap().assigned_agent_id, "c2");
    }

    #[test]
    fn allocate_unknown_or_non_task_is_none() {
        let (hive, _) = hive();
        hive.connect(None, AgentCapabilities::default());
        assert!(hive.allocate("task_missing").is_none());
        hive.board().post(Artifact::new("vote", ArtifactKind::Vote, 0));
        assert!(hive.allocate("vote").is_none());
    }

    #[test]
    fn post_result_inherits_from_task_and_heartbeats() {
        let (hive, clock) = hive();
        hive.connect(Some("t1"), AgentCapabilities::with_roles([Role::Tester]));
        let goal = hive.ingest_goal("g", "", Priority::High);
        let task =
            hive.decompose_to_task(&goal, "e2e", Role::Tester, None, Some(Priority::Critical));
        hive.allocate(&task.artifact_id).unwrap();

        clock.advance(500);
        let r = hive.post_result(
            "t1",
            &task.artifact_id,
            ArtifactKind::Result,
            "report",
            map(json!({"success": true})),
            None,
        );
        assert_eq!(r.author_agent_id.as_deref(), Some("t1"));
        assert_eq!(r.role_hint, Some(Role::Tester));
        assert_eq!(r.priority, Priority::Critical);
        assert!((r.confidence - 0.7).abs() < 1e-9);
        assert_eq!(r.payload["task_artifact_id"], json!(task.artifact_id));
        assert_eq!(r.goal_id(), Some(goal.goal_id.as_str()));
        assert_eq!(hive.sessions().get("t1").unwrap().last_seen_ms, 10_500);
        assert_eq!(
            hive.orchestrator().get_assignment(&task.artifact_id).unwrap().status,
            AssignmentStatus::Done
        );
    }

    #[test]
    fn post_result_for_unknown_task_uses_defaults() {
        let (hive, _) = hive();
        let r = hive.post_result(
            "ghost",
            "task_x",
            ArtifactKind::Observation,
            "saw",
            Map::new(),
            Some(0.9),
        );
        assert_eq!(r.priority, Priority::Medium);
        assert_eq!(r.role_hint, None);
        assert_eq!(r.goal_id(), None);
        assert!((r.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn reinforce_scores_and_feeds_back() {
        let (hive, _) = hive();
        let r = hive.board().post(
            Artifact::new("r", ArtifactKind::Result, 0)
                .with_pheromone(0.1)
                .with_confidence(0.8)
                .with_payload(map(json!({"success": true, "evidence": ["a", "b"]}))),
        );
        let score = hive.reinforce(&r.artifact_id);
        // 1.0 + 0.4 + 0.2
        assert!((score.score - 1.6).abs() < 1e-9);
        let after = hive.board().get("r").unwrap();
        assert!((after.pheromone_strength - (0.1 + 1.6 * 0.25)).abs() < 1e-9);
        assert_eq!(after.reinforcement_log()[0]["reason"], "heuristic_score");

        let missing = hive.reinforce("nope");
        assert_eq!(missing.score, 0.0);
        assert_eq!(missing.reason, "artifact_not_found");
    }

    #[test]
    fn converge_goal_respects_threshold() {
        let (hive, _) = hive();
        let goal = hive.ingest_goal("Converge", "", Priority::High);
        post_linked(&hive, "r1", &goal.goal_id, 0.3);
        post_linked(&hive, "r2", &goal.goal_id, 0.3);
        post_linked(&hive, "r3", &goal.goal_id, 0.5);
        post_linked(&hive, "other", "goal_other", 5.0);

        assert!(!hive.converge_goal(&goal.goal_id, 2.0));
        assert_eq!(hive.goals().get(&goal.goal_id).unwrap().status, GoalStatus::Open);

        assert!(hive.converge_goal(&goal.goal_id, 1.0));
        assert_eq!(hive.goals().get(&goal.goal_id).unwrap().status, GoalStatus::Done);
    }

    #[test]
    fn converge_goal_full_scan_matches_index() {
        let clock = Arc::new(ManualClock::new(0));
        let mut config = HiveConfig::default();
        config.board.goal_index = false;
        let hive = HiveCore::with_clock(Arc::new(MemoryStore::new()), config, clock);
        let goal = hive.ingest_goal("Scan", "", Priority::High);
        post_linked(&hive, "r1", &goal.goal_id, 0.3);
        post_linked(&hive, "r2", &goal.goal_id, 0.3);
        post_linked(&hive, "r3", &goal.goal_id, 0.5);
        assert!(!hive.converge_goal(&goal.goal_id, 2.0));
        assert!(hive.converge_goal(&goal.goal_id, 1.0));
    }

    #[test]
    fn converge_ignores_expired_and_unknown_goals() {
        let (hive, clock) = hive();
        let goal = hive.ingest_goal("g", "", Priority::High);
        hive.board().post(
            Artifact::new("short", ArtifactKind::Evidence, clock.now_ms())
                .with_pheromone(10.0)
                .with_ttl_ms(10)
                .with_payload(map(json!({ "goal_id": goal.goal_id }))),
        );
        clock.advance(11);
        assert!(!hive.converge_goal(&goal.goal_id, 1.0));
        assert!(!hive.converge_goal("goal_unknown", 0.0));
    }

    #[test]
    fn read_status_filters_by_title() {
        let (hive, clock) = hive();
        let mvp = hive.ingest_goal("Ship MVP", "", Priority::Critical);
        clock.advance(1);
        hive.ingest_goal("Hire designer", "", Priority::Low);
        hive.goals().mark(&mvp.goal_id, GoalStatus::InProgress);

        let rows = hive.read_status(Some("mvp"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Ship MVP");
        assert_eq!(rows[0].status, GoalStatus::InProgress);
        assert_eq!(hive.read_status(None).len(), 2);
        assert!(hive.read_status(Some("nothing")).is_empty());
    }

    #[test]
    fn memory_and_observations_pass_through() {
        let (hive, _) = hive();
        hive.remember("market", "tam", json!(42), None);
        assert_eq!(hive.recall("market", "tam").unwrap().value, json!(42));
        let id = hive.publish_observation("price_drop", Map::new(), &[Role::Sales]);
        let events = hive.poll_observations(Role::Sales, 10);
        assert_eq!(events[0].event_id, id);
    }

    #[test]
    fn open_uses_configured_backend() {
        let hive = HiveCore::open(HiveConfig::default()).unwrap();
        assert!(hive.board().is_empty());
        let mut cfg = HiveConfig::default();
        cfg.storage.backend = "nope".to_string();
        assert!(HiveCore::open(cfg).is_err());
    }
}
