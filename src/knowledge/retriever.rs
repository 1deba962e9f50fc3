//! Similarity retrieval over the knowledge index

use std::sync::Arc;

use crate::Result;
use crate::db::{KnowledgeIndex, ScoredChunk, TextEmbedder};

/// Default number of chunks retrieved per query
pub const DEFAULT_TOP_K: usize = 3;

/// Finds the chunks most relevant to a query
///
/// Must share its embedder with the indexer that built the namespace.
#[derive(Clone)]
pub struct ContextRetriever {
    embedder: Arc<dyn TextEmbedder>,
    index: KnowledgeIndex,
    namespace: String,
    min_similarity: Option<f32>,
}

impl ContextRetriever {
    /// Create a retriever over one namespace with no similarity floor
    #[must_use]
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        index: KnowledgeIndex,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
            min_similarity: None,
        }
    }

    /// Drop chunks scoring below `min_similarity`
    #[must_use]
    pub const fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }

    #[must_use]
    pub const fn min_similarity(&self) -> Option<f32> {
        self.min_similarity
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Retrieve up to `k` chunks, most similar first
    ///
    /// An empty namespace, a blank query, or nothing above the floor yields an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// Returns error if the query cannot be embedded or the index cannot be read
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        self.check_embedding_space(embedding.len())?;

        let results = self
            .index
            .query(&self.namespace, &embedding, k, self.min_similarity)?;

        tracing::debug!(
            namespace = %self.namespace,
            k,
            found = results.len(),
            top_score = results.first().map(|r| r.score),
            "retrieved context"
        );

        Ok(results)
    }

    /// Warn when the namespace was built in a different embedding space
    fn check_embedding_space(&self, dimension: usize) -> Result<()> {
        let Some(info) = self.index.namespace_info(&self.namespace)? else {
            tracing::debug!(namespace = %self.namespace, "namespace has not been indexed");
            return Ok(());
        };

        if info.embedding_model != self.embedder.model() || info.dimension != dimension {
            tracing::warn!(
                namespace = %self.namespace,
                indexed_model = %info.embedding_model,
                indexed_dimension = info.dimension,
                query_model = %self.embedder.model(),
                query_dimension = dimension,
                "query embedder differs from the one that built the index"
            );
        }

        Ok(())
    }
}
