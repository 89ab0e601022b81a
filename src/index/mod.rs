//! Local vector index: chunk embeddings persisted to a directory.

pub mod entry;
pub mod local;
pub mod types;

pub use entry::{IndexEntry, compute_chunk_hash};
pub use local::LocalVectorIndex;
pub use types::{ChunkInsert, IndexError, IndexSummary, RetrievedPassage, VectorIndex};
