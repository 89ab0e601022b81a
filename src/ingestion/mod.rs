//! Document ingestion: text extraction, chunking, and chunk preparation.

pub mod chunking;
pub mod loader;
pub mod mappers;
pub mod types;

pub use chunking::chunk_text;
pub use loader::{DocumentLoader, PdfLoader, SUPPORTED_EXTENSIONS, is_supported};
pub use mappers::dedupe_chunks;
pub use types::{ChunkSettings, ChunkingError, ExtractionError, IngestError, IngestOutcome};
