//! Grounded, memory-aware answer generation

use std::sync::Arc;

use super::client::{ChatModel, ChatRequest, DEFAULT_TEMPERATURE};
use crate::context::{BuiltContext, ConversationMemory};
use crate::knowledge::{ContextRetriever, DEFAULT_TOP_K};
use crate::{Error, Result};

/// Reply for a blank question
pub const INVALID_QUESTION_REPLY: &str = "Please provide a valid question.";

/// Reply when the model or retrieval fails
pub const ANSWER_ERROR_REPLY: &str =
    "I encountered an error while processing your question. Please try again.";

/// Reply when the model returns no answer
pub const NO_RESPONSE_REPLY: &str = "I couldn't generate a response.";

/// Answers questions from retrieved knowledge and conversation history
#[derive(Clone)]
pub struct ConversationalAnswerer {
    retriever: ContextRetriever,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
    top_k: usize,
    temperature: f32,
}

impl ConversationalAnswerer {
    /// Create an answerer with the default `k` and temperature
    #[must_use]
    pub fn new(
        retriever: ContextRetriever,
        model: Arc<dyn ChatModel>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            model,
            system_prompt: system_prompt.into(),
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Answer a question, mapping every failure to a fixed reply
    ///
    /// Memory is only updated when a real answer is produced.
    pub async fn answer(&self, query: &str, memory: &mut ConversationMemory) -> String {
        match self.try_answer(query, memory).await {
            Ok(answer) => answer,
            Err(Error::EmptyQuery) => INVALID_QUESTION_REPLY.to_string(),
            Err(Error::EmptyAnswer) => NO_RESPONSE_REPLY.to_string(),
            Err(e) => {
                tracing::error!(error = %e, "answer generation failed");
                ANSWER_ERROR_REPLY.to_string()
            }
        }
    }

    /// Answer a question
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyQuery` for a blank question, `Error::EmptyAnswer`
    /// when the model produces nothing, or the retrieval or model error
    pub async fn try_answer(&self, query: &str, memory: &mut ConversationMemory) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            tracing::warn!("empty question");
            return Err(Error::EmptyQuery);
        }

        tracing::debug!(state = "retrieving", k = self.top_k, "answering question");
        let chunks = self.retriever.retrieve(query, self.top_k).await?;

        let context = BuiltContext::new(&self.system_prompt, &chunks, memory);
        let request = ChatRequest {
            system: context.format_system(),
            user: query.to_string(),
            temperature: self.temperature,
        };

        tracing::debug!(
            state = "generating",
            model = self.model.name(),
            chunks = chunks.len(),
            history = memory.len(),
            "answering question"
        );
        let answer = self
            .model
            .complete(&request)
            .await?
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(Error::EmptyAnswer)?;

        memory.push(query, answer.clone());
        tracing::debug!(state = "memory_update", turns = memory.len(), "answering question");

        let preview: String = answer.chars().take(80).collect();
        tracing::info!(answer = %preview, "generated answer");
        tracing::debug!(state = "idle", "answering question");

        Ok(answer)
    }
}
