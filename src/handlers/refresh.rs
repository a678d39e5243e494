use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::AppError;
use crate::models::RefreshSummary;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub processed: usize,
    pub updated: usize,
    pub alerts_emitted: usize,
    pub score_changes: usize,
    pub errors: usize,
    pub persistence_failures: Vec<String>,
    pub duration_ms: u64,
}

impl From<RefreshSummary> for RefreshResponse {
    fn from(summary: RefreshSummary) -> Self {
        Self {
            success: true,
            processed: summary.processed,
            updated: summary.updated,
            alerts_emitted: summary.alerts_emitted,
            score_changes: summary.score_changes,
            errors: summary.errors,
            persistence_failures: summary.persistence_failures,
            duration_ms: summary.duration_ms,
        }
    }
}

/// `POST /api/cron/refresh-scores`; credentials are checked by the cron auth layer.
///
/// The pass runs on its own task, so a caller that disconnects mid-pass does
/// not cut it off between the score upsert and the alert insert.
pub async fn refresh_scores(State(state): State<AppState>) -> Result<Json<RefreshResponse>, AppError> {
    info!("Refresh pass triggered over HTTP");
    let orchestrator = state.orchestrator.clone();
    let summary = tokio::spawn(async move { orchestrator.run_pass().await })
        .await
        .map_err(|e| {
            error!(error = %e, "Refresh pass task aborted");
            AppError::InternalError(format!("Refresh pass aborted: {}", e))
        })??;
    Ok(Json(summary.into()))
}
