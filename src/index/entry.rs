//! Helpers for building persisted index entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Single chunk persisted in the local index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Random identifier assigned at insertion.
    pub id: String,
    /// Chunk text.
    pub text: String,
    /// SHA-256 of the chunk text, hex encoded.
    pub chunk_hash: String,
    /// Position of the chunk within its source document.
    pub position: usize,
    /// Embedding vector.
    pub vector: Vec<f32>,
    /// RFC3339 insertion timestamp.
    pub indexed_at: String,
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for entry storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub(crate) fn generate_entry_id() -> String {
    Uuid::new_v4().to_string()
}

/// Cosine similarity of two vectors; `0.0` when either has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::format_description::well_known::Rfc3339;

    #[test]
    fn chunk_hash_is_stable_hex() {
        let first = compute_chunk_hash("Total amount due: $420");
        assert_eq!(first, compute_chunk_hash("Total amount due: $420"));
        assert_eq!(first.len(), 64);
        assert_ne!(first, compute_chunk_hash("Total amount due: $421"));
    }

    #[test]
    fn timestamps_parse_back() {
        let stamp = current_timestamp_rfc3339();
        assert!(OffsetDateTime::parse(&stamp, &Rfc3339).is_ok());
    }

    #[test]
    fn cosine_similarity_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[2.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
