//! Startup helpers for the relay server.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;

use crate::config::RelayConfig;
use crate::server::{self, AppState};

/// Run the relay until interrupted.
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure. Missing or
/// invalid configuration fails before the port is bound.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();

    tracing::info!("Starting LINE chat relay v{}", env!("CARGO_PKG_VERSION"));

    let config = match RelayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    let state = match initialize(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e:#}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(
        state,
        config.server.port,
        shutdown_signal(),
    )) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Relay stopped");
    ExitCode::SUCCESS
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub fn initialize(config: &RelayConfig) -> anyhow::Result<Arc<AppState>> {
    tracing::info!(
        model = %config.completion.model,
        completion_url = %config.completion.base_url,
        timeout_secs = config.completion.timeout.as_secs(),
        persona = config.session.persona.is_some(),
        "Completion settings"
    );

    AppState::from_config(config).context("Failed to build relay state")
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
