use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::error::AppError;
use crate::AppState;

/// Prometheus text exposition of the refresh metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<Response, AppError> {
    let metrics_text = state.metrics.export().map_err(|e| {
        error!("Failed to export metrics: {}", e);
        e
    })?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        metrics_text,
    )
        .into_response())
}
