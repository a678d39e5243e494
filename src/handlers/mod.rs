pub mod health;
pub mod metrics;
pub mod protocols;
pub mod refresh;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::cron_auth_middleware;
use crate::AppState;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use protocols::{get_protocol, list_protocols};
pub use refresh::{refresh_scores, RefreshResponse};

/// Routes guarded by the cron secret
pub fn create_cron_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/refresh-scores", post(refresh_scores))
        .route_layer(middleware::from_fn_with_state(state, cron_auth_middleware))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/protocols", get(list_protocols))
        .route("/api/protocols/:slug", get(get_protocol))
        .route("/metrics", get(metrics_handler))
        .nest("/api/cron", create_cron_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
