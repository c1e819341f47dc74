//! mathtutor-server — HTTP API over the problem lifecycle.

pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use mathtutor_core::engine::TutorEngine;

/// Application state shared across handlers.
pub struct AppState {
    pub engine: Arc<TutorEngine>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<TutorEngine>) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
        }
    }
}

/// Build the application router.
pub fn router(engine: Arc<TutorEngine>) -> Router {
    Router::new()
        .merge(routes::problem_routes())
        .merge(routes::health_routes())
        .with_state(Arc::new(AppState::new(engine)))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C.
pub async fn serve(addr: &str, engine: Arc<TutorEngine>) -> Result<()> {
    let app = router(engine);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
