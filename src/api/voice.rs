//! Voice query endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use uuid::Uuid;

use super::ApiState;

/// Multipart field carrying the audio upload
const AUDIO_FIELD: &str = "file";

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/process_voice", post(process_voice))
        .route("/reset", post(reset))
        .route("/history", get(history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Voice query response
#[derive(Debug, Serialize)]
pub struct ProcessVoiceResponse {
    pub response_text: String,
    /// Base64-encoded WAV, empty when no audio was produced
    pub audio_response: String,
}

/// Answer a spoken question uploaded as multipart form data
///
/// Reads the `file` field, or the first non-empty field when there is none.
async fn process_voice(
    State(state): State<Arc<ApiState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessVoiceResponse>, VoiceError> {
    let audio = read_audio(multipart).await?;
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, bytes = audio.len(), "received audio upload");

    let reply = {
        let mut memory = state.memory.lock().await;
        state.pipeline.process(&audio, &mut memory).await
    };
    tracing::info!(
        %request_id,
        audio_bytes = reply.audio.len(),
        "voice query answered"
    );

    Ok(Json(ProcessVoiceResponse {
        response_text: reply.text,
        audio_response: STANDARD.encode(&reply.audio),
    }))
}

async fn read_audio(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<u8>, VoiceError> {
    let mut multipart = multipart.map_err(|e| VoiceError::BadRequest(e.body_text()))?;

    let mut fallback = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| VoiceError::BadRequest(e.body_text()))?
    {
        let is_audio_field = field.name() == Some(AUDIO_FIELD);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| VoiceError::BadRequest(e.body_text()))?;

        if is_audio_field {
            return non_empty(bytes.to_vec());
        }
        if fallback.is_none() && !bytes.is_empty() {
            fallback = Some(bytes.to_vec());
        }
    }

    fallback.map_or_else(|| Err(VoiceError::BadRequest("no audio uploaded".to_string())), non_empty)
}

fn non_empty(audio: Vec<u8>) -> Result<Vec<u8>, VoiceError> {
    if audio.is_empty() {
        Err(VoiceError::BadRequest("empty audio upload".to_string()))
    } else {
        Ok(audio)
    }
}

/// Conversation reset response
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub status: &'static str,
}

/// Forget the conversation so far
async fn reset(State(state): State<Arc<ApiState>>) -> Json<ResetResponse> {
    state.memory.lock().await.clear();
    tracing::info!("conversation memory cleared");
    Json(ResetResponse { status: "cleared" })
}

/// Conversation history response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub history: String,
    pub turns: usize,
}

/// Current conversation transcript
async fn history(State(state): State<Arc<ApiState>>) -> Json<HistoryResponse> {
    let memory = state.memory.lock().await;
    Json(HistoryResponse {
        history: memory.transcript(),
        turns: memory.len(),
    })
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    BadRequest(String),
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let Self::BadRequest(reason) = self;
        tracing::warn!(reason = %reason, "rejected voice upload");

        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Failed to process audio.",
            }),
        )
            .into_response()
    }
}
