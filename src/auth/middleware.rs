use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::AppError;
use crate::AppState;

/// Rejects the request before any work unless it carries the cron secret as a
/// bearer token. With no secret configured the trigger is closed.
pub async fn cron_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = state.cron_secret.as_ref().ok_or_else(|| {
        warn!("Refresh trigger called but no CRON_SECRET is configured");
        AppError::AuthenticationError("Refresh trigger is disabled".to_string())
    })?;

    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(|header| secret.verify_header(header))
        .unwrap_or(false);

    if !authorized {
        warn!(path = %request.uri().path(), "Rejected refresh trigger with invalid credentials");
        return Err(AppError::AuthenticationError("Invalid cron credentials".to_string()));
    }

    Ok(next.run(request).await)
}
