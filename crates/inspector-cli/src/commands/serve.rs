//! HTTP server command

use anyhow::{Context, Result};
use inspector_core::Store;
use tokio::net::TcpListener;
use tracing::info;

use inspector_cli::api::{create_router, handlers::AppState};

use crate::output::Output;

/// Serve the HTTP API until interrupted
pub async fn run(store: Store, bind: &str, output: &Output) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    let addr = listener.local_addr()?;

    info!(
        "Serving {} documents from {}",
        store.document_count()?,
        store.config().sqlite_path().display()
    );
    output.message(&format!("Listening on http://{}", addr));

    let app = create_router(AppState::new(store));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
}
