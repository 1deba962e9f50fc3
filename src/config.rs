//! Configuration management for VoiceMate
//!
//! Settings come from the process environment (after loading `.env`) and the
//! persona file. [`Config::from_lookup`] takes any key lookup so tests never
//! touch the real environment.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use crate::agent::{
    ChatClient, ChatModel, ConversationalAnswerer, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
    DEFAULT_TEMPERATURE,
};
use crate::context::ConversationMemory;
use crate::db::{self, DEFAULT_EMBEDDING_MODEL, Embedder, KnowledgeIndex, TextEmbedder};
use crate::knowledge::{ContextRetriever, DEFAULT_TOP_K};
use crate::pipeline::VoicePipeline;
use crate::voice::{
    RecognitionOptions, SpeechRecognizer, SpeechSynthesizer, SpeechToText, Synthesizer,
    TextToSpeech, Transcriber,
};
use crate::{Error, Persona, Result};

/// OpenAI API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default namespace for the knowledge base
pub const DEFAULT_NAMESPACE: &str = "candidate_info";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8080;

/// VoiceMate configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Active persona
    pub persona: Persona,

    /// Path to data directory (database)
    pub data_dir: PathBuf,

    /// Path to the knowledge index database
    pub db_path: PathBuf,

    /// Knowledge source document
    pub source_path: PathBuf,

    /// API keys
    pub api_keys: ApiKeys,

    /// Chat model configuration
    pub llm: LlmConfig,

    /// Embedding model configuration
    pub embedding: EmbeddingConfig,

    /// Retrieval configuration
    pub retrieval: RetrievalConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,

    /// Uniform per-stage timeout for the pipeline
    pub stage_timeout: Option<Duration>,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// Chat model key (`GROQ_API_KEY` or `VOICEMATE_LLM_API_KEY`)
    pub llm: Option<SecretString>,

    /// `OpenAI` API key (embeddings, Whisper, and TTS)
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<SecretString>,

    /// `Deepgram` API key (optional STT)
    pub deepgram: Option<SecretString>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

/// The embedding model and namespace are configured together
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub namespace: String,
    pub top_k: usize,
    /// Chunks scoring below this are dropped; unset keeps the top `k`
    pub min_similarity: Option<f32>,
}

/// Speech recognition backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    /// Whisper on Groq's OpenAI-compatible API
    Groq,
    /// Whisper on `OpenAI`
    OpenAi,
    Deepgram,
}

/// Speech synthesis backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    OpenAi,
    ElevenLabs,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    pub stt_provider: SttProvider,

    /// STT model (e.g. "whisper-large-v3", "whisper-1", "nova-2")
    pub stt_model: String,

    /// Recognition language
    pub language: String,

    pub tts_provider: TtsProvider,

    /// TTS model (e.g. "tts-1", "`eleven_monolingual_v1`")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier
    pub tts_speed: f32,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,
}

impl SttProvider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "openai" | "whisper" => Ok(Self::OpenAi),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::Groq => "whisper-large-v3",
            Self::OpenAi => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }
}

impl TtsProvider {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "tts-1",
            Self::ElevenLabs => "eleven_monolingual_v1",
        }
    }
}

/// Default data directory (`~/.local/share/voicemate` on Linux)
#[must_use]
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "voicemate", "voicemate")
        .map_or_else(|| PathBuf::from("data"), |d| d.data_dir().to_path_buf())
}

impl Config {
    /// Load configuration from the environment, reading `.env` first
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or the persona cannot be loaded
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env"),
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns error if a value is malformed or the persona cannot be loaded
    #[allow(clippy::too_many_lines)]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let secret = |key: &str| get(key).map(SecretString::from);

        let persona = match get("VOICEMATE_PERSONA_FILE") {
            Some(path) => Persona::load(&PathBuf::from(path))?,
            None => Persona::builtin()?,
        };

        let api_keys = ApiKeys {
            llm: secret("VOICEMATE_LLM_API_KEY").or_else(|| secret("GROQ_API_KEY")),
            openai: secret("OPENAI_API_KEY"),
            elevenlabs: secret("ELEVENLABS_API_KEY"),
            deepgram: secret("DEEPGRAM_API_KEY"),
        };

        let data_dir = get("VOICEMATE_DATA_DIR").map_or_else(default_data_dir, PathBuf::from);
        let db_path = get("VOICEMATE_DB_PATH")
            .map_or_else(|| data_dir.join("voicemate.db"), PathBuf::from);
        let source_path = PathBuf::from(
            get("VOICEMATE_SOURCE").unwrap_or_else(|| "data/info.txt".to_string()),
        );

        let llm = LlmConfig {
            base_url: get("VOICEMATE_LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: get("VOICEMATE_LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            temperature: parse_or(
                get("VOICEMATE_LLM_TEMPERATURE"),
                "VOICEMATE_LLM_TEMPERATURE",
                DEFAULT_TEMPERATURE,
            )?,
        };

        let embedding = EmbeddingConfig {
            model: get("VOICEMATE_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            base_url: get("VOICEMATE_EMBEDDING_BASE_URL")
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
        };

        let retrieval = RetrievalConfig {
            namespace: get("VOICEMATE_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            top_k: parse_or(get("VOICEMATE_TOP_K"), "VOICEMATE_TOP_K", DEFAULT_TOP_K)?,
            min_similarity: parse_opt(
                get("VOICEMATE_MIN_SIMILARITY"),
                "VOICEMATE_MIN_SIMILARITY",
            )?,
        };

        let stt_provider = get("VOICEMATE_STT_PROVIDER")
            .map_or(Ok(SttProvider::Groq), |v| SttProvider::parse(&v))?;
        let tts_provider = get("VOICEMATE_TTS_PROVIDER")
            .map_or(Ok(TtsProvider::OpenAi), |v| TtsProvider::parse(&v))?;

        let voice = VoiceConfig {
            stt_provider,
            stt_model: get("VOICEMATE_STT_MODEL")
                .or_else(|| {
                    // The persona's model only applies to Whisper backends
                    (stt_provider != SttProvider::Deepgram)
                        .then(|| persona.stt_model().map(str::to_string))
                        .flatten()
                })
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
            language: persona.stt_language().to_string(),
            tts_provider,
            tts_model: get("VOICEMATE_TTS_MODEL")
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            tts_voice: get("VOICEMATE_TTS_VOICE")
                .or_else(|| persona.tts_voice().map(str::to_string))
                .unwrap_or_else(|| "alloy".to_string()),
            tts_speed: persona.tts_speed(),
        };

        let api_server = ApiServerConfig {
            port: parse_or(
                get("VOICEMATE_PORT").or_else(|| get("PORT")),
                "VOICEMATE_PORT",
                DEFAULT_PORT,
            )?,
        };

        let timeout_secs: u64 = parse_or(
            get("VOICEMATE_STAGE_TIMEOUT_SECS"),
            "VOICEMATE_STAGE_TIMEOUT_SECS",
            0,
        )?;
        let stage_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            persona,
            data_dir,
            db_path,
            source_path,
            api_keys,
            llm,
            embedding,
            retrieval,
            voice,
            api_server,
            stage_timeout,
        })
    }

    /// Fresh conversation memory sized by the persona
    #[must_use]
    pub fn memory(&self) -> ConversationMemory {
        ConversationMemory::new(self.persona.window_size())
    }

    /// Open the knowledge index database
    ///
    /// # Errors
    ///
    /// Returns error if the database cannot be opened
    pub fn open_index(&self) -> Result<KnowledgeIndex> {
        Ok(KnowledgeIndex::new(db::init(&self.db_path)?))
    }

    /// Build the embedding client
    ///
    /// # Errors
    ///
    /// Returns error if `OPENAI_API_KEY` is not set
    pub fn embedder(&self) -> Result<Arc<dyn TextEmbedder>> {
        let key = require(self.api_keys.openai.as_ref(), "OPENAI_API_KEY")?;
        Ok(Arc::new(Embedder::with_model(
            key,
            self.embedding.model.clone(),
            self.embedding.base_url.clone(),
        )?))
    }

    /// Build the chat model client
    ///
    /// # Errors
    ///
    /// Returns error if no chat API key is set
    pub fn chat_model(&self) -> Result<Arc<dyn ChatModel>> {
        let key = require(self.api_keys.llm.as_ref(), "GROQ_API_KEY")?;
        Ok(Arc::new(ChatClient::new(
            key,
            self.llm.model.clone(),
            self.llm.base_url.clone(),
        )?))
    }

    /// Build the speech recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the selected provider's key is not set
    pub fn recognizer(&self) -> Result<Arc<dyn SpeechRecognizer>> {
        let model = self.voice.stt_model.clone();
        let stt = match self.voice.stt_provider {
            SttProvider::Groq => SpeechToText::new_whisper(
                require(self.api_keys.llm.as_ref(), "GROQ_API_KEY")?,
                model,
                DEFAULT_LLM_BASE_URL.to_string(),
            )?,
            SttProvider::OpenAi => SpeechToText::new_whisper(
                require(self.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
                model,
                OPENAI_BASE_URL.to_string(),
            )?,
            SttProvider::Deepgram => SpeechToText::new_deepgram(
                require(self.api_keys.deepgram.as_ref(), "DEEPGRAM_API_KEY")?,
                model,
            )?,
        };
        Ok(Arc::new(stt))
    }

    /// Build the speech synthesis backend
    ///
    /// # Errors
    ///
    /// Returns error if the selected provider's key is not set
    pub fn speech_synthesizer(&self) -> Result<Arc<dyn SpeechSynthesizer>> {
        let tts = match self.voice.tts_provider {
            TtsProvider::OpenAi => TextToSpeech::new_openai(
                require(self.api_keys.openai.as_ref(), "OPENAI_API_KEY")?,
                self.voice.tts_voice.clone(),
                self.voice.tts_speed,
                self.voice.tts_model.clone(),
                OPENAI_BASE_URL.to_string(),
            )?,
            TtsProvider::ElevenLabs => TextToSpeech::new_elevenlabs(
                require(self.api_keys.elevenlabs.as_ref(), "ELEVENLABS_API_KEY")?,
                self.voice.tts_voice.clone(),
                self.voice.tts_model.clone(),
            )?,
        };
        Ok(Arc::new(tts))
    }

    /// Build the retriever over an opened index
    #[must_use]
    pub fn retriever(
        &self,
        embedder: Arc<dyn TextEmbedder>,
        index: KnowledgeIndex,
    ) -> ContextRetriever {
        let retriever =
            ContextRetriever::new(embedder, index, self.retrieval.namespace.clone());
        match self.retrieval.min_similarity {
            Some(floor) => retriever.with_min_similarity(floor),
            None => retriever,
        }
    }

    /// Build the answerer
    ///
    /// # Errors
    ///
    /// Returns error if the index cannot be opened or a key is missing
    pub fn answerer(&self) -> Result<ConversationalAnswerer> {
        let retriever = self.retriever(self.embedder()?, self.open_index()?);
        Ok(
            ConversationalAnswerer::new(retriever, self.chat_model()?, self.persona.system_prompt())
                .with_top_k(self.retrieval.top_k)
                .with_temperature(self.llm.temperature),
        )
    }

    /// Build the full voice pipeline
    ///
    /// # Errors
    ///
    /// Returns error if any backend cannot be built
    pub fn pipeline(&self) -> Result<VoicePipeline> {
        let transcriber = Transcriber::new(self.recognizer()?).with_options(RecognitionOptions {
            language: self.voice.language.clone(),
            temperature: 0.0,
        });
        let synthesizer = Synthesizer::new(self.speech_synthesizer()?);

        let pipeline = VoicePipeline::new(transcriber, self.answerer()?, synthesizer);
        Ok(match self.stage_timeout {
            Some(timeout) => pipeline.with_stage_timeout(timeout),
            None => pipeline,
        })
    }
}

fn require(key: Option<&SecretString>, name: &str) -> Result<SecretString> {
    key.cloned()
        .ok_or_else(|| Error::Config(format!("{name} is not set")))
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T> {
    Ok(parse_opt(value, key)?.unwrap_or(default))
}

fn parse_opt<T: std::str::FromStr>(value: Option<String>, key: &str) -> Result<Option<T>> {
    value
        .map(|v| {
            v.parse()
                .map_err(|_| Error::Config(format!("invalid value for {key}: {v}")))
        })
        .transpose()
}
