//! Answer-to-speech synthesis with canonical WAV output

use std::sync::Arc;

use super::codec;
use super::sanitize::sanitize_for_speech;
use super::tts::SpeechSynthesizer;
use crate::{Error, Result};

/// Converts answer text into a mono WAV buffer
#[derive(Clone)]
pub struct Synthesizer {
    backend: Arc<dyn SpeechSynthesizer>,
}

impl Synthesizer {
    /// Create a synthesizer over a TTS backend
    #[must_use]
    pub fn new(backend: Arc<dyn SpeechSynthesizer>) -> Self {
        Self { backend }
    }

    /// Synthesize text, returning an empty buffer on blank input or any failure
    pub async fn synthesize(&self, text: &str) -> Vec<u8> {
        match self.try_synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(error = %e, "speech generation failed");
                Vec::new()
            }
        }
    }

    /// Synthesize text into 16-bit mono WAV
    ///
    /// Blank text, or text that sanitizes to nothing, yields `Ok(vec![])`
    /// without calling the backend.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails, returns nothing, or returns audio
    /// that cannot be decoded or holds no samples
    pub async fn try_synthesize(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let clean = sanitize_for_speech(text);
        if clean.is_empty() {
            tracing::debug!("nothing speakable after sanitization");
            return Ok(Vec::new());
        }

        let encoded = self.backend.synthesize(&clean).await?;
        if encoded.is_empty() {
            return Err(Error::Tts(format!(
                "{} returned no audio",
                self.backend.name()
            )));
        }

        let decoded = codec::decode(&encoded)
            .map_err(|e| Error::Tts(format!("undecodable synthesis output: {e}")))?;
        if decoded.samples.is_empty() {
            return Err(Error::Tts(format!(
                "{} returned audio with no samples",
                self.backend.name()
            )));
        }
        let wav = codec::samples_to_wav(&decoded.samples, decoded.sample_rate)?;

        let preview: String = clean.chars().take(50).collect();
        tracing::info!(
            backend = self.backend.name(),
            text = %preview,
            bytes = wav.len(),
            "generated speech"
        );
        Ok(wav)
    }
}
