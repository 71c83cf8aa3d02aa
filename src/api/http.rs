// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::handlers::{ApiHandlers, ApiResponse};
use crate::sync::{SyncOrchestrator, SyncOutcome, SyncStatus};

pub struct HttpServer {
    handlers: ApiHandlers,
    addr: SocketAddr,
}

impl HttpServer {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, addr: SocketAddr) -> Self {
        Self {
            handlers: ApiHandlers::new(orchestrator),
            addr,
        }
    }

    fn router(handlers: ApiHandlers) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/hooks/sync", post(trigger_sync_handler))
            .route("/hooks/sync/status", get(sync_status_handler))
            .with_state(Arc::new(handlers))
    }

    pub async fn serve(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.addr).await?;
        self.serve_on(listener, cancel).await
    }

    /// Serve on an already bound listener until `cancel` fires
    pub async fn serve_on(self, listener: TcpListener, cancel: CancellationToken) -> anyhow::Result<()> {
        info!(addr = %listener.local_addr()?, "Starting HTTP server");

        axum::serve(listener, Self::router(self.handlers))
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    ApiHandlers::health().await
}

async fn trigger_sync_handler(
    State(handlers): State<Arc<ApiHandlers>>,
) -> (StatusCode, Json<ApiResponse<SyncOutcome>>) {
    handlers.trigger_sync().await
}

async fn sync_status_handler(
    State(handlers): State<Arc<ApiHandlers>>,
) -> Json<ApiResponse<SyncStatus>> {
    handlers.sync_status()
}
