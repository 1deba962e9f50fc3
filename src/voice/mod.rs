//! Voice processing module
//!
//! Handles audio decoding, quality-gated transcription, and speech
//! synthesis. Backends sit behind [`SpeechRecognizer`] and
//! [`SpeechSynthesizer`].

pub mod codec;
mod sanitize;
pub mod stt;
mod synthesizer;
mod transcriber;
pub mod tts;

pub use codec::{MonoAudio, SAMPLE_RATE, samples_to_wav};
pub use sanitize::sanitize_for_speech;
pub use stt::{RecognitionOptions, SpeechRecognizer, SpeechToText};
pub use synthesizer::Synthesizer;
pub use transcriber::{
    QUIET_THRESHOLD, TARGET_PEAK, Transcriber, gate_and_normalize, peak_amplitude,
};
pub use tts::{SpeechSynthesizer, TextToSpeech};
