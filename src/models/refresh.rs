use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage at which a single protocol was dropped from a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    History,
    PriorScore,
    Watchers,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::History => "history",
            FailureStage::PriorScore => "prior_score",
            FailureStage::Watchers => "watchers",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFailure {
    pub protocol: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of one refresh pass. Counts reflect what actually happened,
/// including writes that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// Protocols selected into the batch and attempted
    pub processed: usize,
    /// Score records written by the bulk upsert
    pub updated: usize,
    /// Protocols whose score moved enough to raise an alert
    pub score_changes: usize,
    /// Alert rows written (one per watcher)
    pub alerts_emitted: usize,
    /// Per-protocol failures
    pub errors: usize,
    pub failures: Vec<ProtocolFailure>,
    /// Bulk writes that failed, with context
    pub persistence_failures: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}
