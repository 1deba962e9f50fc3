//! Error types for the voice query pipeline

use thiserror::Error;

/// Result type alias for VoiceMate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification used to pick log severity and user-facing fallbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or unusable user input (blank query, quiet or undecodable audio)
    Input,
    /// A recognition, embedding, generation, or synthesis backend failed
    Model,
    /// The offline indexing run failed
    Indexing,
    /// Missing or invalid configuration
    Configuration,
    /// Local storage or serialization failure
    Storage,
    /// A stage exceeded the configured timeout
    Timeout,
}

/// Errors that can occur in VoiceMate
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Query was blank after trimming
    #[error("query is empty")]
    EmptyQuery,

    /// Audio peak amplitude was below the quiet-audio threshold
    #[error("audio too quiet (peak {peak:.4})")]
    QuietAudio { peak: f32 },

    /// Recognizer returned no text
    #[error("transcript is empty")]
    EmptyTranscript,

    /// Audio container could not be decoded or encoded
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Generative model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Generative model returned no answer
    #[error("model returned no answer")]
    EmptyAnswer,

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Embedding error
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Knowledge indexing error
    #[error("indexing error: {0}")]
    Indexing(String),

    /// A pipeline stage timed out
    #[error("{stage} timed out")]
    Timeout { stage: &'static str },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Classify this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyQuery | Self::QuietAudio { .. } | Self::EmptyTranscript | Self::Audio(_) => {
                ErrorKind::Input
            }
            Self::Stt(_)
            | Self::Llm(_)
            | Self::EmptyAnswer
            | Self::Tts(_)
            | Self::Embedding(_)
            | Self::Http(_) => ErrorKind::Model,
            Self::Indexing(_) => ErrorKind::Indexing,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Io(_) | Self::Serialization(_) | Self::Database(_) | Self::Sqlite(_) => {
                ErrorKind::Storage
            }
        }
    }

    /// Whether this error stems from user input rather than a failure
    #[must_use]
    pub const fn is_input(&self) -> bool {
        matches!(self.kind(), ErrorKind::Input)
    }
}
