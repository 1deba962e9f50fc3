//! VoiceMate - spoken question answering over a personal knowledge base
//!
//! This library provides the voice query pipeline:
//! - Quality-gated transcription of uploaded audio
//! - Retrieval over an embedded knowledge base
//! - Grounded answers with bounded conversation memory
//! - Speech synthesis of the answer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        HTTP (/process_voice)   │   CLI (ask, query)  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Voice Pipeline                       │
//! │   Transcriber  →  Answerer  →  Synthesizer          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │   Knowledge index (SQLite)  │  STT │ LLM │ TTS APIs  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod knowledge;
pub mod persona;
pub mod pipeline;
pub mod voice;

pub use agent::{ChatClient, ChatModel, ChatRequest, ConversationalAnswerer};
pub use config::Config;
pub use context::{BuiltContext, ConversationMemory, Turn};
pub use db::{
    DbConn, DbPool, Embedder, KnowledgeChunk, KnowledgeIndex, KnowledgeIndexer, ScoredChunk,
    TextEmbedder,
};
pub use error::{Error, ErrorKind, Result};
pub use knowledge::{ContextRetriever, TextSplitter, split_text};
pub use persona::Persona;
pub use pipeline::{VoicePipeline, VoiceReply};
pub use voice::{
    SpeechRecognizer, SpeechSynthesizer, SpeechToText, Synthesizer, TextToSpeech, Transcriber,
};
