//! Persona configuration
//!
//! A persona is a JSON document naming who answers, the instruction given to
//! the chat model, voice preferences, and how much conversation to remember.
//! The built-in persona ships in `personas/candidate.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_WINDOW;
use crate::{Error, Result};

/// Built-in persona document
const BUILTIN_PERSONA: &str = include_str!("../personas/candidate.json");

/// Instruction used when a persona carries none
const FALLBACK_SYSTEM_PROMPT: &str = "You answer questions using only the provided knowledge. \
     Keep answers short and conversational, and say so when the knowledge does not cover a question.";

/// The identity and behavior of the answering voice
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    /// Persona document version
    #[serde(default = "default_version")]
    pub version: String,

    pub identity: Identity,

    #[serde(default)]
    pub personality: Personality,

    pub voice: Option<Voice>,

    #[serde(default)]
    pub memory: MemoryConfig,
}

/// Who the persona is
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Short description
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    /// Instruction given to the chat model
    pub system_prompt: Option<String>,
}

/// Voice preferences
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    pub tts: Option<TtsConfig>,
    pub stt: Option<SttConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsConfig {
    /// Voice name or id for the synthesis backend
    pub voice: Option<String>,

    /// Speaking rate
    #[serde(default = "default_tts_speed")]
    pub speed: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SttConfig {
    /// Recognition model
    pub model: Option<String>,

    /// Recognition language
    pub language: Option<String>,
}

/// How much conversation is remembered
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryConfig {
    /// Number of exchanges kept
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
        }
    }
}

fn default_version() -> String {
    "1.0.0".to_string()
}

const fn default_tts_speed() -> f32 {
    1.0
}

const fn default_window_size() -> usize {
    DEFAULT_WINDOW
}

impl Persona {
    /// Parse a persona from JSON
    ///
    /// # Errors
    ///
    /// Returns error if the document is not a valid persona
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The persona compiled into the binary
    ///
    /// # Errors
    ///
    /// Returns error if the built-in document is invalid
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_PERSONA)
    }

    /// Load a persona from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read persona {}: {e}", path.display()))
        })?;
        let persona = Self::from_json(&json)?;

        tracing::info!(id = %persona.id(), path = %path.display(), "loaded persona");
        Ok(persona)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.identity.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    /// Instruction for the chat model
    #[must_use]
    pub fn system_prompt(&self) -> &str {
        self.personality
            .system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(FALLBACK_SYSTEM_PROMPT)
    }

    /// Preferred TTS voice
    #[must_use]
    pub fn tts_voice(&self) -> Option<&str> {
        self.voice
            .as_ref()
            .and_then(|v| v.tts.as_ref())
            .and_then(|t| t.voice.as_deref())
    }

    /// TTS speaking rate (defaults to 1.0)
    #[must_use]
    pub fn tts_speed(&self) -> f32 {
        self.voice
            .as_ref()
            .and_then(|v| v.tts.as_ref())
            .map_or_else(default_tts_speed, |t| t.speed)
    }

    /// Preferred STT model
    #[must_use]
    pub fn stt_model(&self) -> Option<&str> {
        self.voice
            .as_ref()
            .and_then(|v| v.stt.as_ref())
            .and_then(|s| s.model.as_deref())
    }

    /// Recognition language (defaults to English)
    #[must_use]
    pub fn stt_language(&self) -> &str {
        self.voice
            .as_ref()
            .and_then(|v| v.stt.as_ref())
            .and_then(|s| s.language.as_deref())
            .unwrap_or("en")
    }

    /// Number of exchanges kept in conversation memory
    #[must_use]
    pub const fn window_size(&self) -> usize {
        self.memory.window_size
    }
}
