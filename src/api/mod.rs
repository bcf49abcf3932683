//! HTTP front-end for the rate comparator.

pub mod handlers;
pub mod routes;

use crate::core::RateComparator;
use anyhow::{Context, Result};
use handlers::AppState;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serves the API on `bind` until `shutdown` is cancelled.
pub async fn serve(comparator: RateComparator, bind: &str, shutdown: CancellationToken) -> Result<()> {
    let state = Arc::new(AppState {
        comparator: Arc::new(comparator),
    });
    let router = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(address = %listener.local_addr()?, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}
