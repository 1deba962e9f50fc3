//! Text embedding for knowledge indexing and retrieval
//!
//! The same embedder must be used at index time and query time; vectors from
//! different models are not comparable.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// A text embedding model producing fixed-dimension vectors
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Generate embeddings for multiple texts, in input order
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Model identifier, recorded alongside indexed vectors
    fn model(&self) -> &str;

    /// Generate embedding for a single text
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails or returns nothing
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("empty embedding response".to_string()))
    }
}

/// Text embedder using an OpenAI-compatible embeddings API
#[derive(Debug, Clone)]
pub struct Embedder {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl Embedder {
    /// Create a new embedder with the default model
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_model(
            api_key,
            DEFAULT_EMBEDDING_MODEL.to_string(),
            "https://api.openai.com/v1".to_string(),
        )
    }

    /// Create an embedder with a custom model and endpoint
    ///
    /// # Errors
    ///
    /// Returns error if API key is empty
    pub fn with_model(api_key: SecretString, model: String, base_url: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key required for embeddings".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Serialize embedding to bytes for `SQLite` storage
    #[must_use]
    pub fn to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding
            .iter()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    /// Deserialize embedding from bytes
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or([0; 4]);
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

#[async_trait]
impl TextEmbedder for Embedder {
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        #[derive(serde::Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a [&'a str],
        }

        #[derive(serde::Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(serde::Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
            index: usize,
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Embedding(format!("Embedding API error {status}: {body}")));
        }

        let mut result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("failed to parse embedding response: {e}")))?;

        if result.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        // Sort by index to maintain input order
        result.data.sort_by_key(|d| d.index);

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let embedding = vec![1.0, 2.5, -3.25, 0.0, 100.0];
        let bytes = Embedder::to_bytes(&embedding);
        let restored = Embedder::from_bytes(&bytes);

        assert_eq!(embedding.len(), restored.len());
        for (a, b) in embedding.iter().zip(restored.iter()) {
            assert!((a - b).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_empty_api_key() {
        let result = Embedder::new(SecretString::from(String::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_model_name() {
        let embedder = Embedder::new(SecretString::from("key".to_string())).unwrap();
        assert_eq!(embedder.model(), DEFAULT_EMBEDDING_MODEL);
    }
}
