//! # Vellum Web
//!
//! Axum HTTP layer over the ingestion pipeline and query engine. Transport
//! only: every route delegates to the injected services and translates
//! failures into JSON error responses.

mod error;
mod routes;
mod state;

pub use error::WebError;
pub use routes::create_router;
pub use state::AppState;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing::info;

/// Bind and serve the API until the process is stopped.
pub async fn start_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("Invalid bind address {host}:{port}"))?;

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
