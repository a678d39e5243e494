use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::Grade;

/// Append-only record of one protocol's score at one refresh pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistoryEntry {
    pub protocol_slug: String,
    pub score_overall: u32,
    pub grade: Grade,
    pub recorded_at: DateTime<Utc>,
}
