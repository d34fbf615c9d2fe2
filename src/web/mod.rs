//! Web server exposing the Prometheus scrape endpoint.
//!
//! The endpoint only reads the registry, so it stays available even when
//! every probe is failing.

use crate::metrics::PrometheusSink;

use axum::{extract::State, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sink: Arc<PrometheusSink>,
}

/// Scrape server for walmon.
pub struct Server {
    port: u16,
    state: AppState,
}

impl Server {
    pub fn new(port: u16, sink: Arc<PrometheusSink>) -> Self {
        Self {
            port,
            state: AppState { sink },
        }
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/metrics", get(handle_metrics))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until a shutdown signal arrives.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn handle_metrics(State(state): State<AppState>) -> String {
    state.sink.encode()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
