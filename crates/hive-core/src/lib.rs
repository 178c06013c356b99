//! hive-core: stigmergic coordination substrate for agent swarms.
//!
//! Agents never message each other directly. They post artifacts to a shared board, read what
//! others left behind, and reinforce what worked; goals converge once enough reinforced work
//! accumulates under them. [`HiveCore`] ties the components together.

mod board;
mod emergence;
mod error;
mod goals;
mod hive;
mod memory;
mod observation;
mod orchestrator;
mod sessions;
mod shared;
mod store;

// Shared types, ids, clock, config
pub use shared::{
    new_id, BoardConfig, Clock, EmergenceConfig, GoalsConfig, HiveConfig, ManualClock, Priority,
    Role, StorageConfig, SystemClock, ARTIFACT_PREFIX, GOAL_INDEX_PREFIX, GOAL_PREFIX,
    MEMORY_PREFIX,
};

pub use error::{HiveError, HiveResult, StoreError};

// Keyed store
pub use store::{
    decode, encode, open_store, shallow_merge, DurableStore, KeyedStore, MemoryStore, SledBackend,
    StoreBackend,
};

// Coordination components
pub use board::{board_order, Artifact, ArtifactKind, StigmergyBoard, REINFORCEMENT_LOG_KEY};
pub use emergence::{EmergenceEngine, EmergenceScore, DEFAULT_SCORE_REASON, NOT_FOUND_REASON};
pub use goals::{GoalHierarchy, GoalNode, GoalStatus};
pub use memory::{CollectiveMemory, MemoryRecord};
pub use observation::{ObservationBus, ObservationEvent};
pub use orchestrator::{AssignmentStatus, RoleOrchestrator, TaskAssignment};
pub use sessions::{AgentCapabilities, AgentSession, SessionRegistry};

// Facade
pub use hive::{GoalStatusView, HiveCore};
