//! Quality-gated transcription
//!
//! Decodes the incoming container, downmixes to mono, rejects clips that are
//! too quiet to carry speech, peak-normalizes the rest, and hands a canonical
//! WAV to the recognizer with deterministic decoding options.

use std::sync::Arc;

use super::codec::{self, MonoAudio};
use super::stt::{RecognitionOptions, SpeechRecognizer};
use crate::{Error, ErrorKind, Result};

/// Peak amplitude below which a clip is treated as silence
pub const QUIET_THRESHOLD: f32 = 0.01;

/// Peak amplitude clips are normalized to
pub const TARGET_PEAK: f32 = 0.9;

/// Converts raw audio bytes into normalized text
#[derive(Clone)]
pub struct Transcriber {
    recognizer: Arc<dyn SpeechRecognizer>,
    options: RecognitionOptions,
}

impl Transcriber {
    /// Create a transcriber with deterministic English decoding
    #[must_use]
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer,
            options: RecognitionOptions::default(),
        }
    }

    /// Override the decoding options
    #[must_use]
    pub fn with_options(mut self, options: RecognitionOptions) -> Self {
        self.options = options;
        self
    }

    /// Transcribe audio, returning an empty string on any failure
    pub async fn transcribe(&self, audio: &[u8]) -> String {
        match self.try_transcribe(audio).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::Input => {
                tracing::warn!(error = %e, "rejected audio input");
                String::new()
            }
            Err(e) => {
                tracing::error!(error = %e, "transcription failed");
                String::new()
            }
        }
    }

    /// Transcribe audio
    ///
    /// # Errors
    ///
    /// - `Error::Audio` if the container cannot be decoded
    /// - `Error::QuietAudio` if the clip peak is below [`QUIET_THRESHOLD`]
    /// - `Error::EmptyTranscript` if the recognizer heard nothing
    /// - the recognizer's error if the backend fails
    pub async fn try_transcribe(&self, audio: &[u8]) -> Result<String> {
        let decoded = codec::decode(audio)?;
        tracing::info!(
            sample_rate = decoded.sample_rate,
            samples = decoded.samples.len(),
            "audio loaded"
        );

        let prepared = gate_and_normalize(decoded)?;
        let wav = codec::samples_to_wav(&prepared.samples, prepared.sample_rate)?;

        let raw = self.recognizer.recognize(&wav, &self.options).await?;
        let transcript = raw.trim();
        if transcript.is_empty() {
            return Err(Error::EmptyTranscript);
        }

        tracing::info!(
            backend = self.recognizer.name(),
            transcript,
            "transcription complete"
        );
        Ok(transcript.to_string())
    }
}

/// Largest absolute sample value
#[must_use]
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Reject quiet clips and scale the rest so the peak sits at [`TARGET_PEAK`]
///
/// # Errors
///
/// Returns `Error::QuietAudio` if the peak is below [`QUIET_THRESHOLD`]
pub fn gate_and_normalize(mut audio: MonoAudio) -> Result<MonoAudio> {
    let peak = peak_amplitude(&audio.samples);
    if peak < QUIET_THRESHOLD {
        return Err(Error::QuietAudio { peak });
    }

    let gain = TARGET_PEAK / peak;
    for sample in &mut audio.samples {
        *sample *= gain;
    }

    tracing::debug!(peak, gain, "normalized audio");
    Ok(audio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::codec::SAMPLE_RATE;

    fn mono(samples: Vec<f32>) -> MonoAudio {
        MonoAudio {
            samples,
            sample_rate: SAMPLE_RATE,
        }
    }

    #[test]
    fn test_peak_amplitude() {
        assert!((peak_amplitude(&[0.1, -0.6, 0.3]) - 0.6).abs() < f32::EPSILON);
        assert!(peak_amplitude(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_silence_rejected() {
        let result = gate_and_normalize(mono(vec![0.0; 1600]));
        assert!(matches!(result, Err(Error::QuietAudio { .. })));

        let result = gate_and_normalize(mono(vec![0.005, -0.009, 0.002]));
        assert!(matches!(result, Err(Error::QuietAudio { .. })));
    }

    #[test]
    fn test_normalizes_to_target_peak() {
        let normalized = gate_and_normalize(mono(vec![0.1, -0.2, 0.05])).unwrap();
        let peak = peak_amplitude(&normalized.samples);
        assert!((peak - TARGET_PEAK).abs() < 1e-6);
        // Relative shape is preserved
        assert!((normalized.samples[0] - 0.45).abs() < 1e-6);
    }

    #[test]
    fn test_loud_audio_is_attenuated() {
        let normalized = gate_and_normalize(mono(vec![1.0, -0.5])).unwrap();
        assert!((normalized.samples[0] - TARGET_PEAK).abs() < 1e-6);
    }
}
