//! Chat completion client for OpenAI-compatible APIs

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default chat endpoint (Groq's OpenAI-compatible API)
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default chat model
pub const DEFAULT_LLM_MODEL: &str = "llama3-70b-8192";

/// Default sampling temperature for answers
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A single-turn chat request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// System message carrying persona, history, and knowledge
    pub system: String,
    /// The user's question
    pub user: String,
    pub temperature: f32,
}

/// A chat model producing one completion per request
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete a request, returning `None` when the model produced no answer
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>>;

    /// Model identifier for logging
    fn name(&self) -> &str;
}

/// Chat client for `/chat/completions`
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn new(api_key: SecretString, model: String, base_url: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key required for chat model".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extract the first non-blank answer from a completion response
fn first_answer(response: CompletionResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>> {
        let body = CompletionRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("Chat API error {status}: {body}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("failed to parse chat response: {e}")))?;

        Ok(first_answer(parsed))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key() {
        let result = ChatClient::new(
            SecretString::from(String::new()),
            DEFAULT_LLM_MODEL.to_string(),
            DEFAULT_LLM_BASE_URL.to_string(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_first_answer() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"  I studied physics. "}}]}"#;
        let response: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(first_answer(response).as_deref(), Some("I studied physics."));
    }

    #[test]
    fn test_missing_answer() {
        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_answer(empty).is_none());

        let null: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(first_answer(null).is_none());

        let blank: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        assert!(first_answer(blank).is_none());

        let bare: CompletionResponse = serde_json::from_str("{}").unwrap();
        assert!(first_answer(bare).is_none());
    }

    #[test]
    fn test_request_shape() {
        let body = CompletionRequest {
            model: DEFAULT_LLM_MODEL,
            messages: [
                Message {
                    role: "system",
                    content: "be brief",
                },
                Message {
                    role: "user",
                    content: "hi",
                },
            ],
            temperature: 0.5,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["model"], DEFAULT_LLM_MODEL);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["temperature"], 0.5);
    }
}
