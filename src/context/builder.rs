//! Grounded prompt assembly

use super::memory::ConversationMemory;
use crate::db::ScoredChunk;

/// Everything the answerer sends to the chat model for one question
#[derive(Debug, Clone, Default)]
pub struct BuiltContext {
    /// Persona instruction
    pub system_prompt: String,
    /// Retrieved knowledge, most relevant first
    pub knowledge_context: String,
    /// Rendered conversation history
    pub history: String,
}

impl BuiltContext {
    /// Assemble context from the persona, retrieved chunks, and memory
    #[must_use]
    pub fn new(system_prompt: &str, chunks: &[ScoredChunk], memory: &ConversationMemory) -> Self {
        Self {
            system_prompt: system_prompt.trim().to_string(),
            knowledge_context: format_knowledge(chunks),
            history: memory.transcript(),
        }
    }

    /// Format the system message
    ///
    /// The persona instruction comes first, followed by the conversation
    /// history and the retrieved knowledge when present. The user's question
    /// travels separately as the user message.
    #[must_use]
    pub fn format_system(&self) -> String {
        let mut parts = Vec::new();

        if !self.system_prompt.is_empty() {
            parts.push(self.system_prompt.clone());
        }

        if !self.history.is_empty() {
            parts.push(format!(
                "<conversation-history>\n{}\n</conversation-history>",
                self.history
            ));
        }

        if !self.knowledge_context.is_empty() {
            parts.push(format!(
                "<knowledge>\n{}\n</knowledge>",
                self.knowledge_context
            ));
        }

        parts.join("\n\n")
    }
}

/// Format retrieved chunks for prompt injection
#[must_use]
pub fn format_knowledge(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
