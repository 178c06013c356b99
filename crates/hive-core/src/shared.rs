//! Shared types used across all hive components: roles, priorities, ids, clocks, configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use uuid::Uuid;

/// Key prefix for artifacts on the stigmergy board.
pub const ARTIFACT_PREFIX: &str = "artifact:";
/// Key prefix for goal nodes.
pub const GOAL_PREFIX: &str = "goal:";
/// Key prefix for the goal -> artifact secondary index.
pub const GOAL_INDEX_PREFIX: &str = "goal_index:";
/// Key prefix for collective memory records.
pub const MEMORY_PREFIX: &str = "memory:";

/// Capability a session can serve and a task can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Researcher,
    Designer,
    Coder,
    Tester,
    Ops,
    Sales,
    Exec,
    /// The "any role" capability: serves tasks nobody more specific can take.
    General,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Designer => "designer",
            Self::Coder => "coder",
            Self::Tester => "tester",
            Self::Ops => "ops",
            Self::Sales => "sales",
            Self::Exec => "exec",
            Self::General => "general",
        }
    }

    pub fn all() -> [Self; 8] {
        [
            Self::Researcher,
            Self::Designer,
            Self::Coder,
            Self::Tester,
            Self::Ops,
            Self::Sales,
            Self::Exec,
            Self::General,
        ]
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all().into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered priority. Declaration order is the ordering: `Low < Medium < High < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Generates `<prefix>_<12 hex chars>`.
pub fn new_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &hex[..12])
}

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Settable clock for tests and replays.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, delta_ms: i64) -> i64 {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Where the keyed store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `memory` (volatile) or `sled` (persistent with volatile fallback).
    pub backend: String,
    /// Directory for the sled database.
    pub path: String,
}

/// Weights for outcome scoring. Every term is monotonic non-decreasing in its input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergenceConfig {
    pub success_bonus: f64,
    pub confidence_weight: f64,
    /// Evidence items needed for the full evidence contribution.
    pub evidence_cap: u32,
    pub evidence_weight: f64,
    /// Score -> pheromone delta multiplier.
    pub reinforcement_gain: f64,
}

/// Board defaults for artifacts the hive creates on behalf of callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub initial_pheromone: f64,
    pub task_confidence: f64,
    pub trail_confidence: f64,
    pub trail_ttl_ms: i64,
    pub default_result_confidence: f64,
    /// Maintain the goal -> artifact index so convergence avoids a full scan.
    pub goal_index: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsConfig {
    pub default_priority: Priority,
    pub convergence_threshold: f64,
}

/// Hive configuration. Load from TOML or env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HiveConfig {
    pub storage: StorageConfig,
    pub emergence: EmergenceConfig,
    pub board: BoardConfig,
    pub goals: GoalsConfig,
}

impl Default for HiveConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                backend: "memory".to_string(),
                path: "./data/hive_store".to_string(),
            },
            emergence: EmergenceConfig {
                success_bonus: 1.0,
                confidence_weight: 0.5,
                evidence_cap: 5,
                evidence_weight: 0.5,
                reinforcement_gain: 0.25,
            },
            board: BoardConfig {
                initial_pheromone: 0.1,
                task_confidence: 0.6,
                trail_confidence: 0.7,
                trail_ttl_ms: 60_000,
                default_result_confidence: 0.7,
                goal_index: true,
            },
            goals: GoalsConfig {
                default_priority: Priority::High,
                convergence_threshold: 2.0,
            },
        }
    }
}

impl HiveConfig {
    /// Load config from file and environment. Precedence: env `HIVE_*` > file
    /// (`HIVE_CONFIG` path, else `config/hive`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("HIVE_CONFIG").unwrap_or_else(|_| "config/hive".to_string());
        Self::load_from(&config_path)
    }

    /// Same as [`HiveConfig::load`] with an explicit file path (with or without extension).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let d = Self::default();
        let builder = config::Config::builder()
            .set_default("storage.backend", d.storage.backend)?
            .set_default("storage.path", d.storage.path)?
            .set_default("emergence.success_bonus", d.emergence.success_bonus)?
            .set_default("emergence.confidence_weight", d.emergence.confidence_weight)?
            .set_default("emergence.evidence_cap", d.emergence.evidence_cap as i64)?
            .set_default("emergence.evidence_weight", d.emergence.evidence_weight)?
            .set_default(
                "emergence.reinforcement_gain",
                d.emergence.reinforcement_gain,
            )?
            .set_default("board.initial_pheromone", d.board.initial_pheromone)?
            .set_default("board.task_confidence", d.board.task_confidence)?
            .set_default("board.trail_confidence", d.board.trail_confidence)?
            .set_default("board.trail_ttl_ms", d.board.trail_ttl_ms)?
            .set_default(
                "board.default_result_confidence",
                d.board.default_result_confidence,
            )?
            .set_default("board.goal_index", d.board.goal_index)?
            .set_default("goals.default_priority", "high")?
            .set_default(
                "goals.convergence_threshold",
                d.goals.convergence_threshold,
            )?;

        let path = Path::new(config_path);
        let with_ext = Path::new(config_path).with_extension("toml");
        let builder = if path.is_file() {
            builder.add_source(config::File::from(path))
        } else if with_ext.is_file() {
            builder.add_source(config::File::from(with_ext))
        } else {
            builder
        };

        let built = builder
            .add_source(
                config::Environment::with_prefix("HIVE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        built.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_by_declaration() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::Critical.max(Priority::Low), Priority::Critical);
    }

    #[test]
    fn new_id_has_prefix_and_twelve_hex_chars() {
        let id = new_id("task");
        let (prefix, hex) = id.split_once('_').unwrap();
        assert_eq!(prefix, "task");
        assert_eq!(hex.len(), 12);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(new_id("task"), id);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.advance(250), 1_250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::all() {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("astronaut"), None);
    }

    #[test]
    fn load_from_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hive.toml");
        std::fs::write(
            &path,
            "[emergence]\nreinforcement_gain = 0.5\n\n[goals]\ndefault_priority = \"critical\"\n",
        )
        .unwrap();
        let cfg = HiveConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.emergence.reinforcement_gain, 0.5);
        assert_eq!(cfg.goals.default_priority, Priority::Critical);
        assert_eq!(cfg.emergence.evidence_cap, 5);
        assert_eq!(cfg.board.trail_ttl_ms, 60_000);
        assert_eq!(cfg.storage.backend, "memory");
    }

    #[test]
    fn load_from_missing_file_yields_defaults() {
        let cfg = HiveConfig::load_from("/nonexistent/hive-config").unwrap();
        let d = HiveConfig::default();
        assert_eq!(cfg.board.initial_pheromone, d.board.initial_pheromone);
        assert_eq!(cfg.goals.convergence_threshold, d.goals.convergence_threshold);
        assert!(cfg.board.goal_index);
    }
}
