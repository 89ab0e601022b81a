//! Retrieval orchestration: passage search, context assembly, and summary sourcing.

use super::normalize::extract_meaningful_content;
use super::types::{BROAD_TOPIC_K, BROAD_TOPIC_QUERY, Context};
use crate::config::SummarySource;
use crate::index::{IndexError, RetrievedPassage, VectorIndex};
use crate::ingestion::{DocumentLoader, ExtractionError, is_supported};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Text chosen as input for a whole-document summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryInput {
    /// Nothing has been uploaded or indexed.
    NoDocument,
    /// The latest document yielded no text.
    Empty,
    /// Raw document text, capped to the summary budget.
    Text(String),
}

/// Pulls passages and documents for the answer synthesizer.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    loader: Arc<dyn DocumentLoader>,
    upload_dir: PathBuf,
}

impl Retriever {
    /// Construct a retriever over `index`, reading uploads from `upload_dir`.
    pub fn new(
        index: Arc<dyn VectorIndex>,
        loader: Arc<dyn DocumentLoader>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            index,
            loader,
            upload_dir: upload_dir.into(),
        }
    }

    /// Up to `k` passages ordered by similarity to `query`.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>, IndexError> {
        let mut passages = self.index.search(query, k).await?;
        passages.truncate(k);
        tracing::debug!(k, passages = passages.len(), "Retrieved passages");
        Ok(passages)
    }

    /// Select summary input according to `source`, capped at `max_chars` characters.
    pub async fn summary_input(&self, source: SummarySource, max_chars: usize) -> SummaryInput {
        match source {
            SummarySource::LatestUpload => self.latest_upload_text(max_chars).await,
            SummarySource::Index => self.broad_topic_text(max_chars).await,
        }
    }

    /// Re-extract the most recently modified upload.
    pub async fn latest_upload_text(&self, max_chars: usize) -> SummaryInput {
        let Some(path) = self.latest_upload().await else {
            return SummaryInput::NoDocument;
        };

        match self.loader.load(&path).await {
            Ok(text) => SummaryInput::Text(truncate_chars(&text, max_chars)),
            Err(ExtractionError::Empty(_)) => SummaryInput::Empty,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "Failed to re-read latest upload");
                SummaryInput::Empty
            }
        }
    }

    /// Passages answering a broad "what is this about" query, joined by newlines.
    pub async fn broad_topic_text(&self, max_chars: usize) -> SummaryInput {
        match self.retrieve(BROAD_TOPIC_QUERY, BROAD_TOPIC_K).await {
            Ok(passages) if passages.is_empty() => SummaryInput::NoDocument,
            Ok(passages) => {
                let joined = passages
                    .iter()
                    .map(|passage| passage.text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n");
                SummaryInput::Text(truncate_chars(&joined, max_chars))
            }
            Err(error) => {
                tracing::warn!(%error, "Broad topic retrieval failed");
                SummaryInput::NoDocument
            }
        }
    }

    /// Path of the supported upload with the newest modification time.
    pub async fn latest_upload(&self) -> Option<PathBuf> {
        let dir = self.upload_dir.clone();
        match tokio::task::spawn_blocking(move || find_latest_upload(&dir)).await {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(%error, "Upload directory scan failed");
                None
            }
        }
    }
}

fn find_latest_upload(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| {
            let modified = entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, entry.into_path())
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

/// Clean each passage and join survivors with newlines, stopping at `max_chars`.
///
/// The last passage admitted is cut on a character boundary so the context never exceeds the
/// cap. Passages that clean down to nothing are skipped and do not count as contributors.
pub fn build_context(passages: &[RetrievedPassage], max_chars: usize) -> Context {
    let mut text = String::new();
    let mut used = 0usize;
    let mut contributors = Vec::new();

    for passage in passages {
        let cleaned = extract_meaningful_content(&passage.text);
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            continue;
        }

        let separator = usize::from(!text.is_empty());
        let remaining = max_chars.saturating_sub(used + separator);
        if remaining == 0 {
            break;
        }

        if separator == 1 {
            text.push('\n');
        }
        let piece: String = cleaned.chars().take(remaining).collect();
        used += separator + piece.chars().count();
        text.push_str(&piece);
        contributors.push(passage.clone());
    }

    Context {
        text,
        passages: contributors,
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((offset, _)) => text[..offset].to_string(),
        None => text.to_string(),
    }
}
