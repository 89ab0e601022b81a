//! Shared types for the vector index.

use crate::embedding::EmbeddingClientError;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors returned while reading from or writing to the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Index file or directory could not be accessed.
    #[error("index storage failed: {0}")]
    Io(#[from] std::io::Error),
    /// Persisted index could not be encoded or decoded.
    #[error("index serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Persisted index was written by an incompatible format revision.
    #[error("unsupported index format version {found} (expected {expected})")]
    UnsupportedFormat {
        /// Version found on disk.
        found: u32,
        /// Version this build reads and writes.
        expected: u32,
    },
    /// Embedder failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Vector dimension disagrees with the vectors already stored.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the stored vectors.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Embedder returned a different number of vectors than texts supplied.
    #[error("Embedder returned {actual} vectors for {expected} chunks")]
    EmbeddingCount {
        /// Number of chunks submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
}

/// Chunk ready for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkInsert {
    /// Chunk text content.
    pub text: String,
    /// Stable digest used for dedupe.
    pub chunk_hash: String,
    /// Position of the chunk within its document.
    pub position: usize,
}

/// Counters describing the effect of an indexing call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Entries stored in the new snapshot.
    pub inserted: usize,
    /// Chunks dropped because the same text appeared earlier in the batch.
    pub skipped_duplicates: usize,
    /// Entries of the previous snapshot that were discarded.
    pub replaced: usize,
}

/// Chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    /// Chunk text as stored.
    pub text: String,
    /// Zero-based position in the similarity ranking.
    pub rank: usize,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Store of chunk embeddings supporting nearest-neighbor search.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embed `chunks` and make them the entire contents of the index.
    ///
    /// Earlier entries are discarded in the same step, so searches only ever see the most
    /// recently added document. An empty batch leaves the index untouched.
    async fn add(&self, chunks: Vec<ChunkInsert>) -> Result<IndexSummary, IndexError>;

    /// Return up to `k` passages ranked by similarity to `query`.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, IndexError>;

    /// Number of stored entries.
    async fn len(&self) -> usize;

    /// Whether the index holds no entries.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
