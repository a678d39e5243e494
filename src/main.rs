use std::net::SocketAddr;
use std::time::Duration;

use defi_protocol_scores::{config::Settings, handlers::create_router, startup::build_components, utils::init_tracing};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    init_tracing(&settings.logging);
    info!("Starting DeFi protocol scores service");

    let components = build_components(&settings).await?;
    let state = components.app_state(&settings);

    let schedule_handle = settings.refresh.schedule_interval_seconds.map(|seconds| {
        components
            .orchestrator
            .clone()
            .spawn_schedule(Duration::from_secs(seconds))
    });

    let app = create_router(state);
    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("API server listening on {}", addr);
    info!("  POST /api/cron/refresh-scores - Run a refresh pass (Bearer CRON_SECRET)");
    info!("  GET  /api/protocols           - List scored protocols");
    info!("  GET  /api/protocols/:slug     - Get one protocol");
    info!("  GET  /api/health              - Health check");
    info!("  GET  /metrics                 - Prometheus metrics");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                error!("Web server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    if let Some(handle) = schedule_handle {
        handle.abort();
    }
    components.pool.close().await;

    info!("Shutting down DeFi protocol scores service");
    Ok(())
}
