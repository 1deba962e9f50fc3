//! Speech-to-text (STT) backends

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Decoding options passed to the recognizer
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOptions {
    /// ISO-639-1 language code
    pub language: String,
    /// Sampling temperature (0 for deterministic output)
    pub temperature: f32,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            temperature: 0.0,
        }
    }
}

/// A speech recognition model accepting mono WAV audio
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognize speech in 16-bit mono WAV bytes
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails
    async fn recognize(&self, wav: &[u8], options: &RecognitionOptions) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Response from OpenAI-compatible Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// STT provider backend
#[derive(Clone, Debug)]
enum SttProvider {
    Whisper { base_url: String },
    Deepgram,
}

/// Transcribes speech to text over HTTP
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create a new STT instance using an OpenAI-compatible Whisper endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_whisper(api_key: SecretString, model: String, base_url: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key required for Whisper".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider: SttProvider::Whisper {
                base_url: base_url.trim_end_matches('/').to_string(),
            },
        })
    }

    /// Create a new STT instance using Deepgram
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(api_key: SecretString, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider: SttProvider::Deepgram,
        })
    }

    /// Transcribe using a Whisper endpoint
    async fn transcribe_whisper(
        &self,
        base_url: &str,
        audio: &[u8],
        options: &RecognitionOptions,
    ) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Whisper transcription");

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone())
            .text("language", options.language.clone())
            .text("temperature", options.temperature.to_string())
            .text("response_format", "json");

        let response = self
            .client
            .post(format!("{base_url}/audio/transcriptions"))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Stt(format!("Whisper request failed: {e}")))?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Whisper API error {status}: {body}")));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Stt(format!("failed to parse Whisper response: {e}")))?;

        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(&self, audio: &[u8], options: &RecognitionOptions) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting Deepgram transcription");

        let url = format!(
            "https://api.deepgram.com/v1/listen?model={}&language={}&punctuate=true",
            self.model, options.language
        );

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Token {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| Error::Stt(format!("Deepgram request failed: {e}")))?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("Deepgram API error {status}: {body}")));
        }

        let result: DeepgramResponse = response
            .json()
            .await
            .map_err(|e| Error::Stt(format!("failed to parse Deepgram response: {e}")))?;

        Ok(result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl SpeechRecognizer for SpeechToText {
    async fn recognize(&self, wav: &[u8], options: &RecognitionOptions) -> Result<String> {
        match &self.provider {
            SttProvider::Whisper { base_url } => {
                self.transcribe_whisper(base_url, wav, options).await
            }
            SttProvider::Deepgram => self.transcribe_deepgram(wav, options).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.provider {
            SttProvider::Whisper { .. } => "whisper",
            SttProvider::Deepgram => "deepgram",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let result = SpeechToText::new_whisper(
            SecretString::from(String::new()),
            "whisper-1".to_string(),
            "https://api.openai.com/v1".to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let result = SpeechToText::new_deepgram(SecretString::from(String::new()), "nova-2".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_default_options_are_deterministic() {
        let options = RecognitionOptions::default();
        assert_eq!(options.language, "en");
        assert!(options.temperature.abs() < f32::EPSILON);
    }

    #[test]
    fn test_deepgram_response_parse() {
        let json = r#"{"results":{"channels":[{"alternatives":[{"transcript":"hello there"}]}]}}"#;
        let parsed: DeepgramResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.channels[0].alternatives[0].transcript, "hello there");
    }

    #[test]
    fn test_backend_name() {
        let stt = SpeechToText::new_whisper(
            SecretString::from("key".to_string()),
            "whisper-1".to_string(),
            "https://api.openai.com/v1/".to_string(),
        )
        .unwrap();
        assert_eq!(stt.name(), "whisper");
    }
}
