pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod scoring;
pub mod services;
pub mod startup;
pub mod utils;

use std::sync::Arc;

pub use error::types::*;

use auth::CronSecret;
use services::{DatabaseProbe, ProtocolService, RefreshOrchestrator};
use utils::RefreshMetrics;

/// Shared state handed to every axum handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub protocols: Arc<ProtocolService>,
    pub database: Arc<dyn DatabaseProbe>,
    pub metrics: Arc<RefreshMetrics>,
    /// `None` closes the refresh trigger
    pub cron_secret: Option<Arc<CronSecret>>,
}
