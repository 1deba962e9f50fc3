//! Knowledge indexer for the source document
//!
//! Splits the document into overlapping chunks, embeds them in one batch, and
//! writes them to the knowledge index. A run either commits every chunk or
//! nothing.

use std::path::Path;
use std::sync::Arc;

use super::embedder::TextEmbedder;
use super::knowledge::{KnowledgeChunk, KnowledgeIndex};
use crate::knowledge::TextSplitter;
use crate::{Error, Result};

/// Offline indexer populating one namespace
pub struct KnowledgeIndexer {
    embedder: Arc<dyn TextEmbedder>,
    index: KnowledgeIndex,
    namespace: String,
    splitter: TextSplitter,
}

impl KnowledgeIndexer {
    /// Create an indexer with the default splitter
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
            splitter: TextSplitter::default(),
        }
    }

    /// Use a custom splitter
    #[must_use]
    pub fn with_splitter(mut self, splitter: TextSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Index a source file, returning the number of chunks written
    ///
    /// # Errors
    ///
    /// Returns `Error::Indexing` if the file cannot be read, plus any error
    /// from [`Self::index`]
    pub async fn index_file(&self, path: &Path) -> Result<usize> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Indexing(format!("cannot read {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), bytes = text.len(), "loaded knowledge source");
        self.index(&text).await
    }

    /// Index source text, replacing the namespace contents
    ///
    /// # Errors
    ///
    /// Returns `Error::Indexing` if the text is empty, embedding fails, or the
    /// chunks cannot be stored
    pub async fn index(&self, source: &str) -> Result<usize> {
        let pieces = self.splitter.split(source);
        if pieces.is_empty() {
            return Err(Error::Indexing("knowledge source is empty".to_string()));
        }

        tracing::debug!(
            namespace = %self.namespace,
            chunks = pieces.len(),
            chunk_size = self.splitter.chunk_size(),
            overlap = self.splitter.chunk_overlap(),
            "split knowledge source"
        );

        let texts: Vec<&str> = pieces.iter().map(String::as_str).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(|e| Error::Indexing(format!("embedding failed: {e}")))?;

        if embeddings.len() != pieces.len() {
            return Err(Error::Indexing(format!(
                "expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            )));
        }

        let chunks: Vec<KnowledgeChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(seq, (text, embedding))| KnowledgeChunk {
                id: KnowledgeChunk::id_for(seq),
                seq,
                text,
                embedding,
            })
            .collect();

        let written = self
            .index
            .upsert(&self.namespace, &chunks, self.embedder.model())
            .map_err(|e| match e {
                Error::Indexing(_) => e,
                other => Error::Indexing(format!("storing chunks failed: {other}")),
            })?;

        tracing::info!(
            namespace = %self.namespace,
            model = self.embedder.model(),
            count = written,
            "indexed knowledge source"
        );

        Ok(written)
    }
}
