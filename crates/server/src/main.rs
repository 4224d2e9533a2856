//! mealpass server entry point.
//!
//! Boots the HTTP API over the scan-state engine: loads configuration,
//! opens the record store, and serves until SIGINT/SIGTERM.

use anyhow::Result;
use mealpass_core::AppConfig;
use tokio::signal::ctrl_c;
use tracing_subscriber::EnvFilter;

mod auth;
mod error;
mod render;
mod routes;
mod state;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let config = AppConfig::load()?;
    let state = state::AppState::new(config).await?;

    let address = format!("0.0.0.0:{}", state.config.port);
    tracing::info!(%address, "starting mealpass server");

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        if ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => tracing::error!(error = %e, "failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
