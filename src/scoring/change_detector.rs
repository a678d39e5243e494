use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Alert, AlertKind, AlertSeverity};

/// Minimum absolute score movement that raises an alert
pub const ALERT_THRESHOLD: u32 = 5;
/// Absolute movement at which an alert becomes a warning
pub const WARNING_THRESHOLD: u32 = 10;

/// Candidate alert for a significant score movement. Recipients are resolved
/// by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    pub protocol_slug: String,
    pub protocol_name: String,
    pub previous: u32,
    pub current: u32,
    pub delta: i64,
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
}

impl ScoreChange {
    /// Materialize the candidate for one watching subscriber.
    pub fn alert_for(&self, recipient: &str, created_at: DateTime<Utc>) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            protocol_slug: self.protocol_slug.clone(),
            kind: self.kind,
            title: self.title.clone(),
            message: self.message.clone(),
            severity: self.severity,
            recipient: recipient.to_string(),
            is_read: false,
            created_at,
        }
    }
}

/// Classify a score movement. `None` for a new protocol or a move under 5 points.
pub fn detect_score_change(
    protocol_slug: &str,
    protocol_name: &str,
    previous: Option<u32>,
    current: u32,
) -> Option<ScoreChange> {
    let previous = previous?;
    let delta = current as i64 - previous as i64;
    let magnitude = delta.unsigned_abs();

    if magnitude < ALERT_THRESHOLD as u64 {
        return None;
    }

    let kind = if current > previous {
        AlertKind::ScoreRise
    } else {
        AlertKind::ScoreDrop
    };
    let severity = if magnitude >= WARNING_THRESHOLD as u64 {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    };

    Some(ScoreChange {
        protocol_slug: protocol_slug.to_string(),
        protocol_name: protocol_name.to_string(),
        previous,
        current,
        delta,
        kind,
        severity,
        title: format!("{} score changed", protocol_name),
        message: format!("Score changed from {} to {}", previous, current),
    })
}
