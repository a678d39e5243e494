//! Run one refresh pass and print the summary as JSON.

use std::process::ExitCode;

use defi_protocol_scores::{config::Settings, startup::build_components, utils::init_tracing};
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.logging);

    let components = match build_components(&settings).await {
        Ok(components) => components,
        Err(e) => {
            error!(error = %e, "Failed to start refresh");
            return ExitCode::FAILURE;
        }
    };

    let outcome = components.orchestrator.run_pass().await;
    components.pool.close().await;

    match outcome {
        Ok(summary) => match serde_json::to_string_pretty(&summary) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize refresh summary");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            error!(error = %e, "Refresh pass failed");
            ExitCode::FAILURE
        }
    }
}
