//! Voice query pipeline
//!
//! Runs transcription, answering, and synthesis in sequence and maps every
//! failure to a spoken reply. [`VoicePipeline::process`] never fails and
//! never returns empty text.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::agent::ConversationalAnswerer;
use crate::context::ConversationMemory;
use crate::voice::{Synthesizer, Transcriber};
use crate::{Error, ErrorKind, Result};

/// Reply when the audio could not be transcribed
pub const NOT_UNDERSTOOD_REPLY: &str = "Sorry, I couldn't understand. Please try again.";

/// Reply when the question was empty or the model produced nothing
pub const UNPROCESSABLE_REPLY: &str = "I couldn't process your question. Please try again.";

/// Reply when a backend failed
pub const TECHNICAL_ERROR_REPLY: &str = "Technical error occurred. Please try again.";

/// Spoken in place of an answer whose synthesis failed
pub const SPEECH_FAILED_REPLY: &str = "Failed to generate speech for the response.";

/// Text and audio returned for one voice query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceReply {
    /// Answer or fixed reply text, never empty
    pub text: String,
    /// 16-bit mono WAV, empty when even the fallback could not be spoken
    pub audio: Vec<u8>,
}

/// Sequences the voice stages for one request at a time
#[derive(Clone)]
pub struct VoicePipeline {
    transcriber: Transcriber,
    answerer: ConversationalAnswerer,
    synthesizer: Synthesizer,
    stage_timeout: Option<Duration>,
}

impl VoicePipeline {
    /// Create a pipeline with no stage timeout
    #[must_use]
    pub fn new(
        transcriber: Transcriber,
        answerer: ConversationalAnswerer,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            transcriber,
            answerer,
            synthesizer,
            stage_timeout: None,
        }
    }

    /// Bound each stage by `timeout`
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn answerer(&self) -> &ConversationalAnswerer {
        &self.answerer
    }

    /// Answer a spoken question
    ///
    /// Memory is updated only when a real answer is produced.
    pub async fn process(&self, audio: &[u8], memory: &mut ConversationMemory) -> VoiceReply {
        let outcome = AssertUnwindSafe(self.run(audio, memory))
            .catch_unwind()
            .await;

        match outcome {
            Ok(reply) => reply,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(panic = %message, "voice pipeline panicked");
                self.fallback(TECHNICAL_ERROR_REPLY).await
            }
        }
    }

    async fn run(&self, audio: &[u8], memory: &mut ConversationMemory) -> VoiceReply {
        tracing::debug!(bytes = audio.len(), "processing voice query");

        let query = match self
            .stage("transcribe", self.transcriber.try_transcribe(audio))
            .await
        {
            Ok(query) => query,
            Err(e) => {
                log_failure("transcribe", &e);
                return self.fallback(NOT_UNDERSTOOD_REPLY).await;
            }
        };
        tracing::info!(query = %query, "transcribed question");

        let answer = match self
            .stage("answer", self.answerer.try_answer(&query, memory))
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                log_failure("answer", &e);
                let reply = match e {
                    Error::EmptyQuery | Error::EmptyAnswer => UNPROCESSABLE_REPLY,
                    _ => TECHNICAL_ERROR_REPLY,
                };
                return self.fallback(reply).await;
            }
        };

        match self
            .stage("synthesize", self.synthesizer.try_synthesize(&answer))
            .await
        {
            Ok(audio) if !audio.is_empty() => {
                tracing::info!(bytes = audio.len(), "voice query processed");
                VoiceReply {
                    text: answer,
                    audio,
                }
            }
            Ok(_) => {
                tracing::warn!("answer had nothing speakable");
                self.speech_failed(answer).await
            }
            Err(e) => {
                log_failure("synthesize", &e);
                self.speech_failed(answer).await
            }
        }
    }

    /// Keep the real answer text but speak the fixed failure notice
    async fn speech_failed(&self, answer: String) -> VoiceReply {
        let audio = self.speak(SPEECH_FAILED_REPLY).await;
        VoiceReply {
            text: answer,
            audio,
        }
    }

    async fn fallback(&self, reply: &str) -> VoiceReply {
        VoiceReply {
            text: reply.to_string(),
            audio: self.speak(reply).await,
        }
    }

    /// Best-effort synthesis of a fixed reply
    async fn speak(&self, text: &str) -> Vec<u8> {
        match self.stage("synthesize", self.synthesizer.try_synthesize(text)).await {
            Ok(audio) => audio,
            Err(e) => {
                log_failure("synthesize", &e);
                Vec::new()
            }
        }
    }

    async fn stage<T>(
        &self,
        name: &'static str,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.stage_timeout {
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| Error::Timeout { stage: name })?,
            None => future.await,
        }
    }
}

fn log_failure(stage: &str, error: &Error) {
    match error.kind() {
        ErrorKind::Input => tracing::warn!(stage, error = %error, "stage rejected input"),
        _ => tracing::error!(stage, error = %error, "stage failed"),
    }
}
