use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ProtocolScoreRecord;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtocolListResponse {
    pub success: bool,
    pub count: usize,
    pub protocols: Vec<ProtocolScoreRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProtocolResponse {
    pub success: bool,
    pub cached: bool,
    pub protocol: ProtocolScoreRecord,
}

pub async fn list_protocols(State(state): State<AppState>) -> Result<Json<ProtocolListResponse>, AppError> {
    let protocols = state.protocols.list_protocols().await?;
    Ok(Json(ProtocolListResponse {
        success: true,
        count: protocols.len(),
        protocols,
    }))
}

pub async fn get_protocol(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProtocolResponse>, AppError> {
    let slug = slug.trim().to_lowercase();
    if slug.is_empty() {
        return Err(AppError::ValidationError("Protocol slug is required".to_string()));
    }

    let lookup = state.protocols.get_protocol(&slug).await?;
    Ok(Json(ProtocolResponse {
        success: true,
        cached: lookup.cached,
        protocol: lookup.record,
    }))
}
