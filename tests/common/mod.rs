//! Shared test utilities
//!
//! Hand-written fakes for every backend seam, plus audio helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use voicemate::agent::{ChatModel, ChatRequest};
use voicemate::db::{self, KnowledgeIndex, KnowledgeIndexer, TextEmbedder};
use voicemate::knowledge::ContextRetriever;
use voicemate::voice::{
    RecognitionOptions, SAMPLE_RATE, SpeechRecognizer, SpeechSynthesizer, Synthesizer,
    Transcriber, samples_to_wav,
};
use voicemate::{ConversationalAnswerer, DbPool, Error, Result, VoicePipeline};

pub const NAMESPACE: &str = "candidate_info";

pub const PROFILE: &str = "Education: Sam studied computer science at Riverside University \
and graduated with honors.\n\n\
Projects: Sam built a speech recognition service in Rust and a retrieval chatbot.\n\n\
Hobbies: Sam plays chess and climbs on weekends.";

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// Generate sine wave audio samples
pub fn sine_samples(amplitude: f32, duration_secs: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect()
}

/// A mono 16-bit WAV of a 440 Hz tone
pub fn sine_wav(amplitude: f32, duration_secs: f32) -> Vec<u8> {
    samples_to_wav(&sine_samples(amplitude, duration_secs), SAMPLE_RATE).unwrap()
}

/// A mono 16-bit WAV of silence
pub fn silence_wav(duration_secs: f32) -> Vec<u8> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    samples_to_wav(&vec![0.0; num_samples], SAMPLE_RATE).unwrap()
}

/// Decode WAV bytes into spec and normalized samples
pub fn read_wav(bytes: &[u8]) -> (hound::WavSpec, Vec<f32>) {
    let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .map(|s| f32::from(s.unwrap()) / 32768.0)
        .collect();
    (spec, samples)
}

// --- Speech recognition ---

/// Recognizer returning a fixed transcript and recording the audio it heard
pub struct FakeRecognizer {
    reply: Option<String>,
    pub calls: AtomicUsize,
    pub heard: Mutex<Vec<Vec<u8>>>,
    pub options: Mutex<Option<RecognitionOptions>>,
}

impl FakeRecognizer {
    pub fn hearing(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            heard: Mutex::new(Vec::new()),
            options: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
            heard: Mutex::new(Vec::new()),
            options: Mutex::new(None),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn recognize(&self, wav: &[u8], options: &RecognitionOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.heard.lock().unwrap().push(wav.to_vec());
        *self.options.lock().unwrap() = Some(options.clone());
        self.reply
            .clone()
            .ok_or_else(|| Error::Stt("recognizer unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake-stt"
    }
}

// --- Embeddings ---

const EMBEDDING_DIM: usize = 64;

/// Deterministic bag-of-words embedder
///
/// Each lowercase word is hashed into one of 64 buckets, so texts sharing
/// words point in similar directions.
pub struct FakeEmbedder {
    model: String,
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new() -> Arc<Self> {
        Self::with_model("fake-embedding")
    }

    pub fn with_model(model: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            model: "fake-embedding".to_string(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; EMBEDDING_DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(2_166_136_261_u32, |h, b| (h ^ u32::from(b)).wrapping_mul(16_777_619));
            vector[hash as usize % EMBEDDING_DIM] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl TextEmbedder for FakeEmbedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Embedding("embedding service down".to_string()));
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// --- Chat ---

enum ChatBehavior {
    Answer(String),
    Nothing,
    Fail,
    Panic,
    Stall(Duration),
}

/// Chat model with scripted behavior that records every request
pub struct FakeChat {
    behavior: ChatBehavior,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl FakeChat {
    fn with(behavior: ChatBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn answering(text: &str) -> Arc<Self> {
        Self::with(ChatBehavior::Answer(text.to_string()))
    }

    pub fn empty() -> Arc<Self> {
        Self::with(ChatBehavior::Nothing)
    }

    pub fn failing() -> Arc<Self> {
        Self::with(ChatBehavior::Fail)
    }

    pub fn panicking() -> Arc<Self> {
        Self::with(ChatBehavior::Panic)
    }

    pub fn stalling(delay: Duration) -> Arc<Self> {
        Self::with(ChatBehavior::Stall(delay))
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl ChatModel for FakeChat {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            ChatBehavior::Answer(text) => Ok(Some(text.clone())),
            ChatBehavior::Nothing => Ok(None),
            ChatBehavior::Fail => Err(Error::Llm("rate limited".to_string())),
            ChatBehavior::Panic => panic!("chat backend exploded"),
            ChatBehavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Some("too late".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "fake-chat"
    }
}

// --- Speech synthesis ---

/// Synthesizer returning a stereo WAV tone and recording the text it spoke
pub struct FakeSpeech {
    fail: bool,
    audio: fn() -> Vec<u8>,
    pub spoken: Mutex<Vec<String>>,
}

impl FakeSpeech {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            audio: stereo_tone,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            audio: stereo_tone,
            spoken: Mutex::new(Vec::new()),
        })
    }

    /// Backend that answers with a valid WAV header and no samples
    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            audio: header_only_wav,
            spoken: Mutex::new(Vec::new()),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

/// A short 22.05 kHz stereo WAV, as a TTS backend might return
pub fn stereo_tone() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..2205_i32 {
            let value = ((i % 100) * 200) as i16;
            writer.write_sample(value).unwrap();
            writer.write_sample(value / 2).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// A WAV container with no sample frames
pub fn header_only_wav() -> Vec<u8> {
    samples_to_wav(&[], 22050).unwrap()
}

#[async_trait]
impl SpeechSynthesizer for FakeSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("voice service down".to_string()));
        }
        Ok((self.audio)())
    }

    fn name(&self) -> &'static str {
        "fake-tts"
    }
}

// --- Assembly ---

/// Index the sample profile and return a retriever over it
pub async fn indexed_retriever(embedder: Arc<FakeEmbedder>) -> ContextRetriever {
    let index = KnowledgeIndex::new(setup_test_db());
    KnowledgeIndexer::new(embedder.clone(), index.clone(), NAMESPACE)
        .index(PROFILE)
        .await
        .expect("failed to index profile");
    ContextRetriever::new(embedder, index, NAMESPACE)
}

/// An answerer over the indexed sample profile
pub async fn answerer(chat: Arc<FakeChat>) -> ConversationalAnswerer {
    let retriever = indexed_retriever(FakeEmbedder::new()).await;
    ConversationalAnswerer::new(retriever, chat, "You are Sam.")
}

/// A full pipeline over fakes
pub async fn pipeline(
    recognizer: Arc<FakeRecognizer>,
    chat: Arc<FakeChat>,
    speech: Arc<FakeSpeech>,
) -> VoicePipeline {
    VoicePipeline::new(
        Transcriber::new(recognizer),
        answerer(chat).await,
        Synthesizer::new(speech),
    )
}
