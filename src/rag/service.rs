//! Question-answering service coordinating ingestion, retrieval, and synthesis.

use super::retrieval::{Retriever, build_context};
use super::router::{Mode, route};
use super::synthesize::AnswerSynthesizer;
use super::types::{Answer, RagSettings};
use crate::config::Config;
use crate::index::{IndexError, LocalVectorIndex, VectorIndex};
use crate::ingestion::{
    ChunkSettings, DocumentLoader, ExtractionError, IngestError, IngestOutcome, PdfLoader,
    chunk_text, dedupe_chunks, is_supported,
};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::registry::{ConfiguredModelFactory, ModelRegistry};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Abstraction over the QA pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait QaApi: Send + Sync {
    /// Store an uploaded document, then extract, chunk, embed, and index it.
    async fn ingest_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError>;

    /// Answer a question. Content-level failures come back as answers, never as errors.
    async fn answer_question(&self, question: &str) -> Answer;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates the upload pipeline and the summary/QA answer paths.
///
/// Construct once near process start and share through an `Arc`; the HTTP surface and the CLI
/// reuse the same components.
pub struct QaService {
    index: Arc<dyn VectorIndex>,
    loader: Arc<dyn DocumentLoader>,
    retriever: Retriever,
    synthesizer: AnswerSynthesizer,
    upload_dir: PathBuf,
    settings: RagSettings,
    chunking: ChunkSettings,
    metrics: Arc<ServiceMetrics>,
}

impl QaService {
    /// Assemble a service from explicit components.
    pub fn new(
        registry: Arc<ModelRegistry>,
        index: Arc<dyn VectorIndex>,
        loader: Arc<dyn DocumentLoader>,
        upload_dir: impl Into<PathBuf>,
        settings: RagSettings,
        chunking: ChunkSettings,
    ) -> Self {
        let upload_dir = upload_dir.into();
        Self {
            retriever: Retriever::new(index.clone(), loader.clone(), upload_dir.clone()),
            synthesizer: AnswerSynthesizer::new(registry, settings.clone()),
            index,
            loader,
            upload_dir,
            settings,
            chunking,
            metrics: Arc::new(ServiceMetrics::new()),
        }
    }

    /// Build the service described by `config`, opening the on-disk index.
    ///
    /// Models are not contacted here; each is built on first use.
    pub async fn from_config(config: &Config) -> Result<Self, IndexError> {
        let registry = Arc::new(ModelRegistry::new(Box::new(ConfiguredModelFactory::new(
            config.clone(),
        ))));
        tracing::info!(dir = %config.index_dir.display(), "Opening vector index");
        let index = LocalVectorIndex::open(&config.index_dir, registry.clone()).await?;
        Ok(Self::new(
            registry,
            Arc::new(index),
            Arc::new(PdfLoader::new()),
            config.upload_dir.clone(),
            RagSettings::from_config(config),
            ChunkSettings::from_config(config),
        ))
    }

    /// Directory uploads are stored in.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Store, extract, chunk, and index an uploaded document.
    ///
    /// The new document replaces whatever the index held before. On any failure after the file
    /// was stored, the file is removed again so it never becomes the latest upload.
    pub async fn ingest_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError> {
        let filename = sanitize_file_name(filename)?;
        let path = self.store_upload(&filename, &bytes).await?;
        tracing::info!(file = %filename, bytes = bytes.len(), "Stored upload");

        match self.index_stored(&filename, &path).await {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                if let Err(remove_error) = tokio::fs::remove_file(&path).await {
                    tracing::warn!(path = %path.display(), %remove_error, "Failed to discard upload");
                }
                tracing::warn!(file = %filename, %error, "Upload discarded");
                Err(error)
            }
        }
    }

    async fn index_stored(
        &self,
        filename: &str,
        path: &Path,
    ) -> Result<IngestOutcome, IngestError> {
        let text = self.loader.load(path).await?;

        let ChunkSettings {
            chunk_size,
            overlap,
            unit,
        } = self.chunking;
        let chunks = chunk_text(&text, chunk_size, overlap, unit)?;
        let (prepared, duplicates_in_document) = dedupe_chunks(chunks);
        let chunk_count = prepared.len();
        let summary = self.index.add(prepared).await?;
        let skipped_duplicates = duplicates_in_document + summary.skipped_duplicates;

        self.metrics
            .record_document(chunk_count as u64, chunk_size as u64);
        tracing::info!(
            file = %filename,
            chunks = chunk_count,
            chunk_size,
            overlap,
            inserted = summary.inserted,
            replaced = summary.replaced,
            skipped_duplicates,
            "Document indexed"
        );

        Ok(IngestOutcome {
            filename: filename.to_string(),
            chunk_count,
            chunk_size,
            inserted: summary.inserted,
            skipped_duplicates,
        })
    }

    async fn store_upload(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, IngestError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let destination = self.upload_dir.join(filename);
        let partial = self.upload_dir.join(format!("{filename}.part"));
        tokio::fs::write(&partial, bytes).await?;
        tokio::fs::rename(&partial, &destination).await?;
        Ok(destination)
    }

    /// Route `question` and answer it through the summary or QA path.
    pub async fn answer_question(&self, question: &str) -> Answer {
        let mode = route(question);
        let answer = match mode {
            Mode::Summary => {
                let input = self
                    .retriever
                    .summary_input(
                        self.settings.summary_source,
                        self.settings.summary_context_chars,
                    )
                    .await;
                self.synthesizer.summarize(input).await
            }
            Mode::Qa => {
                let passages = match self
                    .retriever
                    .retrieve(question, self.settings.retrieval_k)
                    .await
                {
                    Ok(passages) => passages,
                    Err(error) => {
                        tracing::warn!(%error, "Index lookup failed; treating as empty retrieval");
                        Vec::new()
                    }
                };
                let context = build_context(&passages, self.settings.qa_context_chars);
                tracing::debug!(
                    passages = passages.len(),
                    contributing = context.passages.len(),
                    context_chars = context.text.chars().count(),
                    "Context prepared"
                );
                self.synthesizer.answer(question, &context).await
            }
        };

        self.metrics.record_answer(mode, answer.outcome);
        tracing::info!(
            mode = mode.as_str(),
            outcome = answer.outcome.as_str(),
            sources = answer.sources.len(),
            "Question answered"
        );
        answer
    }

    /// Current metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl QaApi for QaService {
    async fn ingest_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError> {
        QaService::ingest_upload(self, filename, bytes).await
    }

    async fn answer_question(&self, question: &str) -> Answer {
        QaService::answer_question(self, question).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        QaService::metrics_snapshot(self)
    }
}

/// Reduce a client-supplied name to a bare, supported file name.
fn sanitize_file_name(raw: &str) -> Result<String, IngestError> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if name.is_empty() || name.starts_with('.') || name.chars().any(char::is_control) {
        return Err(IngestError::InvalidFileName(raw.to_string()));
    }
    if !is_supported(Path::new(name)) {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        return Err(ExtractionError::UnsupportedType(extension).into());
    }
    Ok(name.to_string())
}
