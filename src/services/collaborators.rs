use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{Alert, ProtocolScoreRecord, ScoreHistoryEntry};

/// Persisted scores, keyed by protocol slug.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Last stored overall score; `None` for a protocol never scored before.
    async fn get_prior_score(&self, protocol_slug: &str) -> Result<Option<u32>, AppError>;

    /// Insert-or-replace every record in one write. Returns rows written.
    async fn upsert_scores(&self, records: &[ProtocolScoreRecord]) -> Result<usize, AppError>;

    async fn append_score_history(&self, entries: &[ScoreHistoryEntry]) -> Result<usize, AppError>;
}

/// Who watches which protocol.
#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    async fn get_watchers(&self, protocol_slug: &str) -> Result<Vec<String>, AppError>;
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<usize, AppError>;
}

/// Read side of the score table for the HTTP API.
#[async_trait]
pub trait ProtocolReader: Send + Sync {
    /// Every stored record, ordered by overall score descending, then slug.
    async fn list_protocols(&self) -> Result<Vec<ProtocolScoreRecord>, AppError>;

    async fn get_protocol(&self, slug: &str) -> Result<Option<ProtocolScoreRecord>, AppError>;
}

/// Liveness check of the backing database.
#[async_trait]
pub trait DatabaseProbe: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;
}
