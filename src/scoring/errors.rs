use thiserror::Error;

use crate::error::AppError;

/// Failures inside a refresh pass.
///
/// Per-protocol variants are isolated by the orchestrator; only
/// `UniverseUnavailable` aborts a pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    #[error("Failed to fetch data for {protocol}: {message}")]
    FetchFailure { protocol: String, message: String },

    #[error("Fetching data for {protocol} timed out after {seconds}s")]
    Timeout { protocol: String, seconds: u64 },

    #[error("{operation} failed for a batch of {batch_size}: {message}")]
    PersistenceFailure {
        operation: String,
        batch_size: usize,
        message: String,
    },

    #[error("Protocol universe unavailable: {message}")]
    UniverseUnavailable { message: String },
}

impl From<RefreshError> for AppError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::UniverseUnavailable { .. }
            | RefreshError::FetchFailure { .. }
            | RefreshError::Timeout { .. } => AppError::ExternalApiError(err.to_string()),
            RefreshError::PersistenceFailure { .. } => AppError::DatabaseError(err.to_string()),
        }
    }
}
