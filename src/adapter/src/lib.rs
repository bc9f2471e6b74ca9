//! HTTP surface of the remote_read adapter

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use common::config::Configuration;
use translator::{MonitoringBackend, Translator};

pub mod error;
pub mod handler;

pub use error::AdapterError;

/// Shared state for the remote_read handlers
#[derive(Clone)]
pub struct AdapterState {
    pub translator: Arc<Translator>,
    /// Answer failed queries with an empty result instead of an error status
    pub empty_on_error: bool,
    pub query_timeout: Duration,
    pub started_at: Instant,
}

impl AdapterState {
    pub fn new(translator: Arc<Translator>, config: &Configuration) -> Self {
        Self {
            translator,
            empty_on_error: config.query.empty_on_error,
            query_timeout: config.query.timeout,
            started_at: Instant::now(),
        }
    }
}

/// Create the adapter router
pub fn router(state: AdapterState) -> Router {
    Router::new()
        .route("/read", post(handler::handle_read))
        .route("/health", get(handler::health))
        .with_state(state)
}

/// Bind the configured listen address and serve until Ctrl-C
pub async fn serve(
    config: &Configuration,
    backend: Arc<dyn MonitoringBackend>,
) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let translator = Arc::new(Translator::from_config(backend, config));
    let app = router(AdapterState::new(translator, config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        project = %config.backend.project_resource(),
        "Listening for remote_read requests"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Adapter stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
