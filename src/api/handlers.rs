// SPDX-License-Identifier: GPL-3.0-only
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::sync::{SyncOrchestrator, SyncOutcome, SyncStatus};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(data: Option<T>, message: String) -> Self {
        Self {
            success: false,
            data,
            error: Some(message),
        }
    }
}

pub struct ApiHandlers {
    orchestrator: Arc<SyncOrchestrator>,
}

impl ApiHandlers {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

impl ApiHandlers {
    pub async fn health() -> Json<ApiResponse<&'static str>> {
        Json(ApiResponse::success("ok"))
    }

    /// Run one sync and report its outcome.
    ///
    /// The run lives in its own task so a client hanging up mid-request does
    /// not abandon a sync halfway through its resources.
    pub async fn trigger_sync(&self) -> (StatusCode, Json<ApiResponse<SyncOutcome>>) {
        info!("Sync requested over HTTP");

        let orchestrator = Arc::clone(&self.orchestrator);
        let outcome = match tokio::spawn(async move { orchestrator.synchronise().await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Sync task failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiResponse::failure(None, e.to_string())),
                );
            }
        };

        let status = match outcome {
            SyncOutcome::Failed { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::OK,
        };
        match failure_message(&outcome) {
            Some(message) => (status, Json(ApiResponse::failure(Some(outcome), message))),
            None => (status, Json(ApiResponse::success(outcome))),
        }
    }

    pub fn sync_status(&self) -> Json<ApiResponse<SyncStatus>> {
        Json(ApiResponse::success(self.orchestrator.status()))
    }
}

fn failure_message(outcome: &SyncOutcome) -> Option<String> {
    match outcome {
        SyncOutcome::Failed { error, .. } => Some(error.clone()),
        SyncOutcome::Partial { failed, .. } => Some(format!("failed to bootstrap: {}", failed.join(", "))),
        SyncOutcome::Completed { signal_delivered: false, .. } => {
            Some("completion signal not acknowledged".to_string())
        }
        _ => None,
    }
}
