//! Namespaced vector index for knowledge chunks
//!
//! Chunks are upserted by `(namespace, id)` and scored in SQL with the
//! sqlite-vec `vec_distance_cosine` function. Each namespace records the
//! embedding model that built it so query-time mismatches can be detected.

use super::DbPool;
use super::embedder::Embedder;
use crate::{Error, Result};

/// A slice of the source document with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeChunk {
    /// Stable identifier (`chunk_{seq}`)
    pub id: String,
    /// Zero-based position in the source document
    pub seq: usize,
    /// Chunk text
    pub text: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl KnowledgeChunk {
    /// Build the canonical id for a sequence number
    #[must_use]
    pub fn id_for(seq: usize) -> String {
        format!("chunk_{seq}")
    }
}

/// A chunk returned from a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    /// Cosine similarity to the query
    pub score: f32,
}

/// Metadata recorded for an indexed namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceInfo {
    pub namespace: String,
    pub embedding_model: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub indexed_at: String,
}

/// Vector index repository for knowledge chunks
#[derive(Clone)]
pub struct KnowledgeIndex {
    pool: DbPool,
}

impl KnowledgeIndex {
    /// Create a new knowledge index over a pool
    #[must_use]
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Write a full set of chunks for a namespace in one transaction
    ///
    /// Chunks are upserted by id; ids whose sequence number is beyond the new
    /// chunk count are pruned so re-indexing a shorter document leaves no
    /// stale rows. `chunks[i].seq` is expected to equal `i`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Indexing` if the batch is empty or has inconsistent
    /// dimensions, or a storage error if the transaction fails (nothing is
    /// committed in that case)
    pub fn upsert(
        &self,
        namespace: &str,
        chunks: &[KnowledgeChunk],
        embedding_model: &str,
    ) -> Result<usize> {
        let Some(first) = chunks.first() else {
            return Err(Error::Indexing("no chunks to write".to_string()));
        };
        let dimension = first.embedding.len();
        if dimension == 0 {
            return Err(Error::Indexing("embeddings are empty".to_string()));
        }
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != dimension) {
            return Err(Error::Indexing(format!(
                "chunk {} has dimension {}, expected {dimension}",
                bad.id,
                bad.embedding.len()
            )));
        }

        let mut conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let tx = conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                r"INSERT INTO knowledge_chunks (namespace, id, seq, text, embedding, updated_at)
                  VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                  ON CONFLICT(namespace, id) DO UPDATE SET
                      seq = excluded.seq,
                      text = excluded.text,
                      embedding = excluded.embedding,
                      updated_at = excluded.updated_at",
            )?;

            for chunk in chunks {
                #[allow(clippy::cast_possible_wrap)]
                let seq = chunk.seq as i64;
                stmt.execute(rusqlite::params![
                    namespace,
                    chunk.id,
                    seq,
                    chunk.text,
                    Embedder::to_bytes(&chunk.embedding),
                ])?;
            }
        }

        #[allow(clippy::cast_possible_wrap)]
        let count = chunks.len() as i64;
        let pruned = tx.execute(
            "DELETE FROM knowledge_chunks WHERE namespace = ?1 AND seq >= ?2",
            rusqlite::params![namespace, count],
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let dimension_col = dimension as i64;
        tx.execute(
            r"INSERT INTO knowledge_namespaces (namespace, embedding_model, dimension, chunk_count, indexed_at)
              VALUES (?1, ?2, ?3, ?4, ?5)
              ON CONFLICT(namespace) DO UPDATE SET
                  embedding_model = excluded.embedding_model,
                  dimension = excluded.dimension,
                  chunk_count = excluded.chunk_count,
                  indexed_at = excluded.indexed_at",
            rusqlite::params![
                namespace,
                embedding_model,
                dimension_col,
                count,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        tracing::info!(
            namespace,
            count = chunks.len(),
            pruned,
            dimension,
            embedding_model,
            "stored knowledge chunks"
        );

        Ok(chunks.len())
    }

    /// Find the `k` chunks most similar to `query_embedding`
    ///
    /// Results are ordered by descending similarity, ties broken by ascending
    /// sequence number. Chunks whose dimension differs from the query are
    /// skipped, as are chunks scoring below `min_similarity` when one is set.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn query(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        k: usize,
        min_similarity: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        if k == 0 || query_embedding.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let embedding_bytes = Embedder::to_bytes(query_embedding);
        #[allow(clippy::cast_possible_wrap)]
        let dimension = query_embedding.len() as i64;

        let mismatched: i64 = conn.query_row(
            r"SELECT COUNT(*) FROM knowledge_chunks
              WHERE namespace = ?1 AND vec_length(embedding) != ?2",
            rusqlite::params![namespace, dimension],
            |row| row.get(0),
        )?;
        if mismatched > 0 {
            tracing::warn!(
                namespace,
                mismatched,
                query_dimension = query_embedding.len(),
                "skipped chunks with a different embedding dimension"
            );
        }

        // The CASE keeps vec_distance_cosine away from mismatched blobs
        let mut stmt = conn.prepare(
            r"SELECT id, seq, text, embedding, score FROM (
                  SELECT id, seq, text, embedding,
                      CASE WHEN vec_length(embedding) = ?3
                          THEN 1.0 - vec_distance_cosine(embedding, ?2)
                      END AS score
                  FROM knowledge_chunks
                  WHERE namespace = ?1
              )
              WHERE score IS NOT NULL AND (?4 IS NULL OR score >= ?4)
              ORDER BY score DESC, seq ASC
              LIMIT ?5",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let rows = stmt.query_map(
            rusqlite::params![
                namespace,
                embedding_bytes,
                dimension,
                min_similarity.map(f64::from),
                k as i64,
            ],
            |row| {
                let seq: i64 = row.get(1)?;
                let embedding: Vec<u8> = row.get(3)?;
                let score: f64 = row.get(4)?;
                #[allow(clippy::cast_possible_truncation)]
                let score = score as f32;
                Ok(ScoredChunk {
                    chunk: KnowledgeChunk {
                        id: row.get(0)?,
                        seq: usize::try_from(seq).unwrap_or_default(),
                        text: row.get(2)?,
                        embedding: Embedder::from_bytes(&embedding),
                    },
                    score,
                })
            },
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }

    /// Load every chunk in a namespace in sequence order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn load(&self, namespace: &str) -> Result<Vec<KnowledgeChunk>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn.prepare(
            "SELECT id, seq, text, embedding FROM knowledge_chunks WHERE namespace = ?1 ORDER BY seq",
        )?;

        let rows = stmt.query_map(rusqlite::params![namespace], |row| {
            let seq: i64 = row.get(1)?;
            let embedding: Vec<u8> = row.get(3)?;
            Ok(KnowledgeChunk {
                id: row.get(0)?,
                seq: usize::try_from(seq).unwrap_or_default(),
                text: row.get(2)?,
                embedding: Embedder::from_bytes(&embedding),
            })
        })?;

        let mut chunks = Vec::new();
        for row in rows {
            chunks.push(row?);
        }

        Ok(chunks)
    }

    /// Chunk ids in a namespace, in sequence order
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn ids(&self, namespace: &str) -> Result<Vec<String>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT id FROM knowledge_chunks WHERE namespace = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(rusqlite::params![namespace], |row| row.get(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }

        Ok(ids)
    }

    /// Number of chunks in a namespace
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn count(&self, namespace: &str) -> Result<usize> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM knowledge_chunks WHERE namespace = ?1",
            rusqlite::params![namespace],
            |row| row.get(0),
        )?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Metadata for a namespace, if it has been indexed
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn namespace_info(&self, namespace: &str) -> Result<Option<NamespaceInfo>> {
        let conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;

        let result = conn.query_row(
            r"SELECT namespace, embedding_model, dimension, chunk_count, indexed_at
              FROM knowledge_namespaces WHERE namespace = ?1",
            rusqlite::params![namespace],
            |row| {
                let dimension: i64 = row.get(2)?;
                let chunk_count: i64 = row.get(3)?;
                Ok(NamespaceInfo {
                    namespace: row.get(0)?,
                    embedding_model: row.get(1)?,
                    dimension: usize::try_from(dimension).unwrap_or_default(),
                    chunk_count: usize::try_from(chunk_count).unwrap_or_default(),
                    indexed_at: row.get(4)?,
                })
            },
        );

        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every chunk and the metadata row for a namespace
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn clear(&self, namespace: &str) -> Result<usize> {
        let mut conn = self.pool.get().map_err(|e| Error::Database(e.to_string()))?;
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM knowledge_chunks WHERE namespace = ?1",
            rusqlite::params![namespace],
        )?;
        tx.execute(
            "DELETE FROM knowledge_namespaces WHERE namespace = ?1",
            rusqlite::params![namespace],
        )?;
        tx.commit()?;

        if deleted > 0 {
            tracing::info!(namespace, deleted, "cleared knowledge namespace");
        }

        Ok(deleted)
    }
}
