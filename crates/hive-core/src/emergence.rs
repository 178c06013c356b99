//! Emergence engine: scores outcomes and turns scores into pheromone deltas.

use crate::board::Artifact;
use crate::shared::{Clock, EmergenceConfig};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_SCORE_REASON: &str = "heuristic_score";
pub const NOT_FOUND_REASON: &str = "artifact_not_found";

/// One scoring decision. The log of these is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceScore {
    pub artifact_id: String,
    pub score: f64,
    pub reason: String,
    pub t_ms: i64,
}

pub struct EmergenceEngine {
    config: EmergenceConfig,
    clock: Arc<dyn Clock>,
    scores: Mutex<Vec<EmergenceScore>>,
}

impl EmergenceEngine {
    pub fn new(config: EmergenceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            scores: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &EmergenceConfig {
        &self.config
    }

    /// Heuristic in three monotonic terms: a success bonus, weighted confidence, and a
    /// saturating evidence count. Appends the result to the score log.
    pub fn score_outcome(&self, artifact: &Artifact) -> EmergenceScore {
        let score = self.heuristic(artifact);
        let reason = artifact
            .payload
            .get("score_reason")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SCORE_REASON)
            .to_string();
        let es = EmergenceScore {
            artifact_id: artifact.artifact_id.clone(),
            score,
            reason,
            t_ms: self.clock.now_ms(),
        };
        tracing::debug!(
            target: "hive::emergence",
            artifact_id = %es.artifact_id,
            score = es.score,
            reason = %es.reason,
            "outcome scored"
        );
        self.scores.lock().push(es.clone());
        es
    }

    fn heuristic(&self, artifact: &Artifact) -> f64 {
        let cfg = &self.config;
        let mut base = 0.0;
        if artifact.payload.get("success") == Some(&Value::Bool(true)) {
            base += cfg.success_bonus;
        }

        let confidence = if artifact.confidence.is_finite() {
            artifact.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        base += confidence * cfg.confidence_weight;

        let evidence = artifact
            .payload
            .get("evidence")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if cfg.evidence_cap > 0 {
            let fill = (evidence as f64 / cfg.evidence_cap as f64).min(1.0);
            base += fill * cfg.evidence_weight;
        }
        base
    }

    /// Pheromone delta for a score: `max(0, score) * reinforcement_gain`.
    pub fn reinforcement_delta(&self, score: &EmergenceScore) -> f64 {
        score.score.max(0.0) * self.config.reinforcement_gain
    }

    /// Zero score for an artifact that could not be read. Not logged.
    pub fn not_found(&self, artifact_id: &str) -> EmergenceScore {
        EmergenceScore {
            artifact_id: artifact_id.to_string(),
            score: 0.0,
            reason: NOT_FOUND_REASON.to_string(),
            t_ms: self.clock.now_ms(),
        }
    }

    /// The last `limit` scores, oldest first.
    pub fn recent_scores(&self, limit: usize) -> Vec<EmergenceScore> {
        let scores = self.scores.lock();
        let start = scores.len().saturating_sub(limit);
        scores[start..].to_vec()
    }
}
