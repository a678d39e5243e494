use std::time::{Duration, Instant};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, error, info};

use crate::config::DatabaseSettings;
use crate::error::AppError;

/// Pool sized for one refresh pass (a handful of bulk statements) plus the
/// read API; idle connections are recycled so a quiet scheduler does not pin
/// server slots.
pub async fn establish_connection(settings: &DatabaseSettings) -> Result<PgPool, AppError> {
    info!(max_connections = settings.max_connections, "Connecting to score store");

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(0)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .test_before_acquire(true)
        .connect(&settings.url)
        .await
        .map_err(|e| {
            error!(error = %e, "Score store unreachable");
            AppError::DatabaseError(format!("Connection failed: {}", e))
        })?;

    Ok(pool)
}

/// `SELECT 1` round trip used by the health endpoint.
pub async fn test_connection(pool: &PgPool) -> Result<(), AppError> {
    let started = Instant::now();
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Ping failed: {}", e)))?;
    debug!(latency_ms = started.elapsed().as_millis() as u64, "Score store ping");
    Ok(())
}
