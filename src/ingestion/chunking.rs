//! Chunk splitting with a size budget and a sliding overlap.
//!
//! - Splitting: `semchunk-rs` cuts along the most semantically meaningful boundaries it can
//!   find (paragraphs, then sentences, then words) while respecting the budget.
//! - Units: budgets are measured in characters by default; `CHUNK_UNIT=tokens` switches to
//!   `cl100k_base` token counts via `tiktoken-rs`.
//! - Overlap: each chunk after the first is prefixed with the tail of its predecessor, bounded
//!   by the overlap budget, and the combined chunk is trimmed back under the size budget.

use crate::config::ChunkUnit;
use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::cl100k_base;

use super::types::ChunkingError;

type SizeCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Split `text` into chunks of at most `chunk_size` units overlapping by at most `overlap`.
///
/// Returns an empty vector when the input text is all whitespace.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    unit: ChunkUnit,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let counter = build_size_counter(unit)?;
    Ok(chunk_text_with_counter(text, chunk_size, overlap, counter))
}

fn build_size_counter(unit: ChunkUnit) -> Result<SizeCounter, ChunkingError> {
    match unit {
        ChunkUnit::Characters => Ok(character_counter()),
        ChunkUnit::Tokens => {
            let encoding = cl100k_base().map_err(|source| ChunkingError::Tokenizer { source })?;
            let encoding = Arc::new(encoding);
            Ok(Arc::new(move |segment: &str| {
                encoding.encode_ordinary(segment).len()
            }))
        }
    }
}

fn character_counter() -> SizeCounter {
    Arc::new(|segment: &str| segment.chars().count())
}

fn chunk_text_with_counter(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    counter: SizeCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    // Reserve room for the carried-over tail so overlap survives the final trim.
    let base_size = (chunk_size - effective_overlap).max(1);
    let counter_for_chunker = counter.clone();
    let chunker = Chunker::new(
        base_size,
        Box::new(move |segment: &str| counter_for_chunker.as_ref()(segment)),
    );
    let base_chunks = chunker
        .chunk(text)
        .into_iter()
        .filter(|chunk| !chunk.trim().is_empty())
        .collect();
    apply_overlap(base_chunks, chunk_size, effective_overlap, &counter)
}

fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &SizeCounter,
) -> Vec<String> {
    let effective_overlap = overlap.min(chunk_size.saturating_sub(1));
    if effective_overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;

    for current in chunks {
        let chunk = match previous.as_deref() {
            Some(prev) => {
                build_overlapped_chunk(prev, &current, effective_overlap, chunk_size, counter)
            }
            None => current.clone(),
        };
        overlapped.push(chunk);
        previous = Some(current);
    }

    overlapped
}

fn build_overlapped_chunk(
    previous: &str,
    current: &str,
    overlap: usize,
    chunk_size: usize,
    counter: &SizeCounter,
) -> String {
    let tail = tail_within_budget(previous, overlap, counter);
    let mut combined = String::with_capacity(tail.len() + current.len() + 1);

    if !tail.is_empty() {
        combined.push_str(tail);
        if !ends_with_whitespace(tail) && !starts_with_whitespace(current) {
            combined.push(' ');
        }
    }

    combined.push_str(current);
    trim_front_to_budget(&combined, chunk_size, counter).to_string()
}

/// Longest suffix of `text` (leading whitespace dropped) whose size fits `budget`.
fn tail_within_budget<'a>(text: &'a str, budget: usize, counter: &SizeCounter) -> &'a str {
    trim_front_to_budget(text, budget, counter)
}

/// Drop characters from the front of `text` until the remainder fits `budget`.
fn trim_front_to_budget<'a>(text: &'a str, budget: usize, counter: &SizeCounter) -> &'a str {
    if budget == 0 {
        return "";
    }

    let trimmed = text.trim_start();
    if counter.as_ref()(trimmed) <= budget {
        return trimmed;
    }

    for (offset, _) in text.char_indices().skip(1) {
        let candidate = text[offset..].trim_start();
        if counter.as_ref()(candidate) <= budget {
            return candidate;
        }
    }

    ""
}

fn starts_with_whitespace(text: &str) -> bool {
    text.chars()
        .next()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars()
        .next_back()
        .map(|c| c.is_whitespace())
        .unwrap_or(false)
}
