//! Chunk preparation helpers.

use crate::index::{ChunkInsert, compute_chunk_hash};
use std::collections::HashSet;

/// Remove duplicate chunks within a document, keeping the first occurrence.
///
/// Returns the surviving chunks and the number of duplicates dropped.
pub fn dedupe_chunks(chunks: Vec<String>) -> (Vec<ChunkInsert>, usize) {
    let mut seen = HashSet::new();
    let mut prepared = Vec::new();
    let mut skipped = 0;

    for text in chunks {
        if text.trim().is_empty() {
            continue;
        }
        let hash = compute_chunk_hash(&text);
        if seen.insert(hash.clone()) {
            let position = prepared.len();
            prepared.push(ChunkInsert {
                text,
                chunk_hash: hash,
                position,
            });
        } else {
            skipped += 1;
        }
    }

    (prepared, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence_and_positions() {
        let (chunks, skipped) = dedupe_chunks(vec![
            "alpha".into(),
            "beta".into(),
            "alpha".into(),
            "   ".into(),
            "gamma".into(),
        ]);

        assert_eq!(skipped, 1);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
        let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }
}
