use chat_relay::{config::RelayConfig, server};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(report) => {
            tracing::error!(error = %report, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(backend = %config.ai_selected, "Loaded configuration");

    match server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            tracing::error!(error = %report, "relay failed");
            ExitCode::FAILURE
        }
    }
}
