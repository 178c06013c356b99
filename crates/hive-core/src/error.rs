//! Error types for hive operations.
//!
//! Missing entities are never errors: lookups return `Option`. These types cover
//! storage I/O, record decoding, configuration, and guarded goal transitions.

use crate::goals::GoalStatus;
use thiserror::Error;

/// Keyed store and backend errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backend I/O failed: {0}")]
    Backend(#[from] sled::Error),

    #[error("failed to encode record under '{key}': {reason}")]
    Encode { key: String, reason: String },

    #[error("malformed {entity} record under '{key}': {reason}")]
    Decode {
        entity: &'static str,
        key: String,
        reason: String,
    },

    #[error("unknown storage backend '{0}' (expected 'memory' or 'sled')")]
    UnknownBackend(String),
}

/// Errors surfaced by the hive facade and goal hierarchy.
#[derive(Debug, Error)]
pub enum HiveError {
    #[error("goal {0} not found")]
    GoalNotFound(String),

    #[error("goal {goal_id} cannot move from {from} to {to}")]
    InvalidTransition {
        goal_id: String,
        from: GoalStatus,
        to: GoalStatus,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type HiveResult<T> = Result<T, HiveError>;
