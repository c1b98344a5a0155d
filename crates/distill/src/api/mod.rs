//! HTTP surface over [`SummaryService`].

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::service::SummaryService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SummaryService>,
}

pub fn router(service: Arc<SummaryService>) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/submit", post(handlers::handle_submit))
        .route("/status/:id", get(handlers::handle_status))
        .route("/result/:id", get(handlers::handle_result))
        .with_state(AppState { service })
}

/// Serves the API until `shutdown` resolves.
pub async fn serve<F>(
    addr: SocketAddr,
    service: Arc<SummaryService>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}
