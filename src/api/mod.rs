//! HTTP API server
//!
//! Provides REST endpoints for:
//! - Service status
//! - Voice queries
//! - Conversation reset and history

mod health;
mod voice;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::context::ConversationMemory;
use crate::pipeline::VoicePipeline;

pub use health::{HealthResponse, StatusResponse};
pub use voice::{HistoryResponse, ProcessVoiceResponse, ResetResponse};

/// Shared state for API handlers
pub struct ApiState {
    /// The voice pipeline
    pub pipeline: VoicePipeline,
    /// The one conversation this server holds, locked for a whole request
    pub memory: Mutex<ConversationMemory>,
}

impl ApiState {
    #[must_use]
    pub fn new(pipeline: VoicePipeline, memory: ConversationMemory) -> Self {
        Self {
            pipeline,
            memory: Mutex::new(memory),
        }
    }
}

/// Build the router with all routes
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::router())
        .merge(voice::router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}
