//! Core data types and error definitions for the ingestion pipeline.

use crate::config::{ChunkUnit, Config};
use crate::index::IndexError;
use anyhow::Error as TokenizerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a document file into raw text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// File could not be read from disk.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path we attempted to read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// File extension is not one the loader understands.
    #[error("unsupported document type: {0}")]
    UnsupportedType(String),
    /// PDF parser rejected the document.
    #[error("failed to extract text from {path}: {message}")]
    Parse {
        /// Path of the rejected document.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
    /// Document parsed but contained no text.
    #[error("document {0} contains no extractable text")]
    Empty(PathBuf),
}

/// Errors produced while splitting raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable.
    #[error("failed to initialize tokenizer: {source}")]
    Tokenizer {
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Upload carried a file name that cannot be stored safely.
    #[error("invalid upload file name: {0}")]
    InvalidFileName(String),
    /// Upload could not be written to the upload directory.
    #[error("failed to store upload: {0}")]
    Storage(#[from] std::io::Error),
    /// Text extraction failed.
    #[error("Failed to extract document: {0}")]
    Extraction(#[from] ExtractionError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Vector index rejected the chunks.
    #[error("Failed to index document: {0}")]
    Index(#[from] IndexError),
}

impl IngestError {
    /// Whether the failure stems from the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFileName(_)
                | Self::Extraction(ExtractionError::UnsupportedType(_))
                | Self::Extraction(ExtractionError::Parse { .. })
                | Self::Extraction(ExtractionError::Empty(_))
        )
    }
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// File name stored in the upload directory.
    pub filename: String,
    /// Number of chunks produced for the document.
    pub chunk_count: usize,
    /// Chunk size used during processing.
    pub chunk_size: usize,
    /// Number of entries now held by the index.
    pub inserted: usize,
    /// Chunks skipped because the same text repeats within the document.
    pub skipped_duplicates: usize,
}

/// Chunking parameters applied to every upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSettings {
    /// Maximum chunk size in `unit`s.
    pub chunk_size: usize,
    /// Maximum overlap with the preceding chunk in `unit`s.
    pub overlap: usize,
    /// Unit chunk sizes are measured in.
    pub unit: ChunkUnit,
}

impl ChunkSettings {
    /// Settings derived from the process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
            unit: config.chunk_unit,
        }
    }
}

impl Default for ChunkSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
            unit: ChunkUnit::Characters,
        }
    }
}
