//! Liveness and readiness probes

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::{AppError, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub latency_ms: u64,
}

/// Answers as long as the process is serving.
pub(super) async fn live() -> &'static str {
    tracing::debug!(endpoint = "/health", "Liveness probe");
    "OK"
}

/// 200 when the store answers a ping, 503 otherwise.
pub(super) async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>> {
    match state.store.ping().await {
        Ok(latency) => {
            tracing::debug!(
                endpoint = "/health/ready",
                latency_ms = latency.as_millis() as u64,
                "Readiness probe"
            );
            Ok(Json(ReadyResponse {
                status: "ready".to_string(),
                latency_ms: latency.as_millis() as u64,
            }))
        }
        Err(e) => Err(AppError::unavailable("Storage is not reachable").with_details(e.to_string())),
    }
}
