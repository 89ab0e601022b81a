//! File-backed vector index.
//!
//! The full index lives in memory as an immutable `IndexSnapshot` behind an `RwLock<Arc<_>>`.
//! Readers clone the `Arc` and search without holding the lock. Writers are serialized by a
//! separate gate: each upload builds a fresh snapshot holding only its own chunks, persists it
//! with a write-then-rename, and only then swaps it in. A crash mid-write leaves the previous
//! `index.json` intact, and readers never observe a half-applied update.

use super::entry::{
    IndexEntry, cosine_similarity, current_timestamp_rfc3339, generate_entry_id,
};
use super::types::{ChunkInsert, IndexError, IndexSummary, RetrievedPassage, VectorIndex};
use crate::registry::ModelRegistry;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

const INDEX_FILE: &str = "index.json";
const INDEX_TMP_FILE: &str = "index.json.tmp";
/// On-disk format revision written by this build.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexSnapshot {
    format_version: u32,
    version: u64,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl IndexSnapshot {
    fn empty() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            ..Self::default()
        }
    }
}

/// Vector index persisted as a single JSON document inside `dir`.
pub struct LocalVectorIndex {
    dir: PathBuf,
    registry: Arc<ModelRegistry>,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    write_gate: Mutex<()>,
}

impl LocalVectorIndex {
    /// Open the index in `dir`, creating the directory when missing.
    ///
    /// An absent index file yields an empty index. Embeddings are computed through the
    /// registry's embedder, which is only built once something needs embedding.
    pub async fn open(
        dir: impl Into<PathBuf>,
        registry: Arc<ModelRegistry>,
    ) -> Result<Self, IndexError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(INDEX_FILE);
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let snapshot: IndexSnapshot = serde_json::from_slice(&bytes)?;
                if snapshot.format_version != FORMAT_VERSION {
                    return Err(IndexError::UnsupportedFormat {
                        found: snapshot.format_version,
                        expected: FORMAT_VERSION,
                    });
                }
                tracing::info!(
                    path = %path.display(),
                    entries = snapshot.entries.len(),
                    version = snapshot.version,
                    "Loaded vector index"
                );
                snapshot
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Starting with an empty vector index");
                IndexSnapshot::empty()
            }
            Err(error) => return Err(error.into()),
        };

        Ok(Self {
            dir,
            registry,
            snapshot: RwLock::new(Arc::new(snapshot)),
            write_gate: Mutex::new(()),
        })
    }

    /// Monotonic revision of the committed snapshot.
    pub async fn version(&self) -> u64 {
        self.current().await.version
    }

    async fn current(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().await.clone()
    }

    async fn persist(&self, snapshot: &IndexSnapshot) -> Result<(), IndexError> {
        let bytes = serde_json::to_vec(snapshot)?;
        let tmp = self.dir.join(INDEX_TMP_FILE);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.dir.join(INDEX_FILE)).await?;
        Ok(())
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, IndexError> {
        let expected = texts.len();
        let embedder = self.registry.embedder().await?;
        let vectors = embedder.generate_embeddings(texts).await?;
        if vectors.len() != expected {
            return Err(IndexError::EmbeddingCount {
                expected,
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

fn check_dimension(expected: Option<usize>, vector: &[f32]) -> Result<(), IndexError> {
    match expected {
        Some(expected) if expected != vector.len() => Err(IndexError::DimensionMismatch {
            expected,
            actual: vector.len(),
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for LocalVectorIndex {
    async fn add(&self, chunks: Vec<ChunkInsert>) -> Result<IndexSummary, IndexError> {
        if chunks.is_empty() {
            return Ok(IndexSummary::default());
        }

        let _writer = self.write_gate.lock().await;
        let (fresh, skipped_duplicates) = {
            let mut seen = HashSet::new();
            let mut fresh = Vec::with_capacity(chunks.len());
            let mut skipped = 0;
            for chunk in chunks {
                if seen.insert(chunk.chunk_hash.clone()) {
                    fresh.push(chunk);
                } else {
                    skipped += 1;
                }
            }
            (fresh, skipped)
        };

        let vectors = self
            .embed(fresh.iter().map(|chunk| chunk.text.clone()).collect())
            .await?;
        let mut dimension = None;
        for vector in &vectors {
            check_dimension(dimension, vector)?;
            dimension.get_or_insert(vector.len());
        }

        let indexed_at = current_timestamp_rfc3339();
        let entries: Vec<IndexEntry> = fresh
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                id: generate_entry_id(),
                text: chunk.text,
                chunk_hash: chunk.chunk_hash,
                position: chunk.position,
                vector,
                indexed_at: indexed_at.clone(),
            })
            .collect();
        let inserted = entries.len();

        let current = self.current().await;
        let replaced = current.entries.len();
        let version = current.version + 1;
        let next = IndexSnapshot {
            format_version: FORMAT_VERSION,
            version,
            dimension,
            entries,
        };

        self.persist(&next).await?;
        *self.snapshot.write().await = Arc::new(next);

        tracing::info!(
            inserted,
            skipped_duplicates,
            replaced,
            version,
            "Replaced index contents"
        );
        Ok(IndexSummary {
            inserted,
            skipped_duplicates,
            replaced,
        })
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, IndexError> {
        let snapshot = self.current().await;
        if snapshot.entries.is_empty() || k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        check_dimension(snapshot.dimension, &query_vector)?;

        let mut scored: Vec<(f32, &IndexEntry)> = snapshot
            .entries
            .iter()
            .map(|entry| (cosine_similarity(&query_vector, &entry.vector), entry))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (score, entry))| RetrievedPassage {
                text: entry.text.clone(),
                rank,
                score,
            })
            .collect())
    }

    async fn len(&self) -> usize {
        self.current().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingClient, EmbeddingClientError, HashingEmbeddingClient};
    use crate::generation::{GenerationError, GenerationRequest, GenerativeModel};
    use crate::index::compute_chunk_hash;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SilentModel;

    #[async_trait]
    impl GenerativeModel for SilentModel {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            Ok(String::new())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    struct CountingEmbedder {
        inner: HashingEmbeddingClient,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingClient for CountingEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.generate_embeddings(texts).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
    }

    fn registry_with(embedder: Arc<dyn EmbeddingClient>) -> Arc<ModelRegistry> {
        Arc::new(ModelRegistry::with_models(
            Arc::new(SilentModel),
            Arc::new(SilentModel),
            embedder,
        ))
    }

    fn hashing_registry(dimension: usize) -> Arc<ModelRegistry> {
        registry_with(Arc::new(HashingEmbeddingClient::new(dimension)))
    }

    fn inserts(texts: &[&str]) -> Vec<ChunkInsert> {
        texts
            .iter()
            .enumerate()
            .map(|(position, text)| ChunkInsert {
                text: text.to_string(),
                chunk_hash: compute_chunk_hash(text),
                position,
            })
            .collect()
    }

    #[tokio::test]
    async fn search_ranks_most_similar_chunk_first() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = LocalVectorIndex::open(dir.path(), hashing_registry(256))
            .await
            .expect("index");

        index
            .add(inserts(&[
                "The invoice total amount due is 420 dollars",
                "Quarterly research methodology and references",
                "Dear team, kind regards from the office",
            ]))
            .await
            .expect("add");

        let results = index.search("invoice amount due", 2).await.expect("search");
        assert_eq!(results.len(), 2);
        assert!(results[0].text.contains("invoice"));
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[1].rank, 1);
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn empty_index_searches_without_embedding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let embedder = Arc::new(CountingEmbedder {
            inner: HashingEmbeddingClient::new(16),
            calls: AtomicUsize::new(0),
        });
        let index = LocalVectorIndex::open(dir.path(), registry_with(embedder.clone()))
            .await
            .expect("index");

        assert!(index.search("anything", 5).await.expect("search").is_empty());
        assert!(index.is_empty().await);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn k_larger_than_index_returns_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = LocalVectorIndex::open(dir.path(), hashing_registry(32))
            .await
            .expect("index");
        index
            .add(inserts(&["alpha chunk", "beta chunk"]))
            .await
            .expect("add");

        assert_eq!(index.search("alpha", 10).await.expect("search").len(), 2);
        assert!(index.search("alpha", 0).await.expect("search").is_empty());
    }

    #[tokio::test]
    async fn each_add_replaces_the_previous_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = LocalVectorIndex::open(dir.path(), hashing_registry(32))
            .await
            .expect("index");

        let first = index
            .add(inserts(&["invoice total due", "invoice payment terms"]))
            .await
            .expect("first");
        assert_eq!(first.inserted, 2);
        assert_eq!(first.replaced, 0);

        let second = index
            .add(inserts(&["letter greeting", "letter greeting", "letter closing"]))
            .await
            .expect("second");
        assert_eq!(second.inserted, 2);
        assert_eq!(second.skipped_duplicates, 1);
        assert_eq!(second.replaced, 2);
        assert_eq!(index.len().await, 2);
        assert_eq!(index.version().await, 2);

        let results = index.search("invoice total due", 5).await.expect("search");
        assert!(results.iter().all(|passage| passage.text.starts_with("letter")));
    }

    #[tokio::test]
    async fn empty_batch_keeps_current_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = LocalVectorIndex::open(dir.path(), hashing_registry(32))
            .await
            .expect("index");
        index.add(inserts(&["kept chunk"])).await.expect("add");

        let summary = index.add(Vec::new()).await.expect("empty add");
        assert_eq!(summary, IndexSummary::default());
        assert_eq!(index.len().await, 1);
        assert_eq!(index.version().await, 1);
    }

    #[tokio::test]
    async fn index_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let index = LocalVectorIndex::open(dir.path(), hashing_registry(32))
                .await
                .expect("index");
            index
                .add(inserts(&["persisted chunk"]))
                .await
                .expect("add");
        }

        let reopened = LocalVectorIndex::open(dir.path(), hashing_registry(32))
            .await
            .expect("reopen");
        assert_eq!(reopened.len().await, 1);
        assert_eq!(reopened.version().await, 1);
        assert!(!dir.path().join(INDEX_TMP_FILE).exists());
        let results = reopened.search("persisted", 1).await.expect("search");
        assert_eq!(results[0].text, "persisted chunk");
    }

    #[tokio::test]
    async fn mismatched_embedder_dimension_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        LocalVectorIndex::open(dir.path(), hashing_registry(32))
            .await
            .expect("index")
            .add(inserts(&["stored with 32 dims"]))
            .await
            .expect("add");

        let reopened = LocalVectorIndex::open(dir.path(), hashing_registry(8))
            .await
            .expect("reopen");
        let error = reopened.search("query", 1).await.unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch {
                expected: 32,
                actual: 8
            }
        ));
    }

    #[tokio::test]
    async fn unknown_format_version_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(INDEX_FILE),
            r#"{"format_version":99,"version":0,"dimension":null,"entries":[]}"#,
        )
        .expect("write");

        let error = LocalVectorIndex::open(dir.path(), hashing_registry(8))
            .await
            .err()
            .expect("format error");
        assert!(matches!(
            error,
            IndexError::UnsupportedFormat { found: 99, .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_see_whole_snapshots_during_writes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = Arc::new(
            LocalVectorIndex::open(dir.path(), hashing_registry(32))
                .await
                .expect("index"),
        );

        let writer = {
            let index = index.clone();
            tokio::spawn(async move {
                for batch in 0..10 {
                    let texts: Vec<String> =
                        (0..3).map(|n| format!("batch {batch} chunk {n}")).collect();
                    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                    index.add(inserts(&refs)).await.expect("add");
                }
            })
        };

        for _ in 0..50 {
            let len = index.len().await;
            assert!(len == 0 || len == 3, "observed partial batch: {len}");
            tokio::task::yield_now().await;
        }
        writer.await.expect("writer");
        assert_eq!(index.len().await, 3);
        assert_eq!(index.version().await, 10);
        let results = index.search("batch 9 chunk 0", 3).await.expect("search");
        assert!(results.iter().all(|passage| passage.text.starts_with("batch 9")));
    }
}
