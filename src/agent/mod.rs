//! Answer generation
//!
//! [`ConversationalAnswerer`] grounds each question in retrieved knowledge
//! and conversation history, then asks a [`ChatModel`] for the answer.

mod answerer;
mod client;

pub use answerer::{
    ANSWER_ERROR_REPLY, ConversationalAnswerer, INVALID_QUESTION_REPLY, NO_RESPONSE_REPLY,
};
pub use client::{
    ChatClient, ChatModel, ChatRequest, DEFAULT_LLM_BASE_URL, DEFAULT_LLM_MODEL,
    DEFAULT_TEMPERATURE,
};
