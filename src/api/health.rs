//! Status endpoints

use axum::{Json, Router, routing::get};
use serde::Serialize;

/// Root status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Is the service running?
async fn status() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: "VoiceMate is running",
    })
}

/// Liveness check
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build status router (no state needed)
pub fn router() -> Router {
    Router::new()
        .route("/", get(status))
        .route("/health", get(health))
}
