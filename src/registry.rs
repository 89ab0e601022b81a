//! Lazily constructed, process-lifetime model handles.
//!
//! Each model kind is built at most once. Construction runs inside
//! [`OnceCell::get_or_try_init`], so concurrent first use from several requests waits on a
//! single initialization instead of building the same model twice. A failed construction is
//! not cached; the next caller retries it.

use crate::config::{Config, EmbeddingProvider};
use crate::embedding::{
    EmbeddingClient, EmbeddingClientError, HashingEmbeddingClient, OllamaEmbeddingClient,
};
use crate::generation::{GenerationError, GenerativeModel, OllamaGenerativeModel};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Builds the heavyweight model handles held by a [`ModelRegistry`].
pub trait ModelFactory: Send + Sync {
    /// Build the whole-document summarizer.
    fn summarizer(&self) -> Result<Arc<dyn GenerativeModel>, GenerationError>;
    /// Build the retrieval-augmented answer generator.
    fn qa_generator(&self) -> Result<Arc<dyn GenerativeModel>, GenerationError>;
    /// Build the embedder used by the vector index.
    fn embedder(&self) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError>;
}

/// Factory wiring models to the configured Ollama runtime.
pub struct ConfiguredModelFactory {
    config: Config,
}

impl ConfiguredModelFactory {
    /// Capture the settings needed to build models later.
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ModelFactory for ConfiguredModelFactory {
    fn summarizer(&self) -> Result<Arc<dyn GenerativeModel>, GenerationError> {
        tracing::info!(model = %self.config.summarization_model, "Initializing summarizer");
        Ok(Arc::new(OllamaGenerativeModel::new(
            self.config.ollama_url.clone(),
            self.config.summarization_model.clone(),
        )?))
    }

    fn qa_generator(&self) -> Result<Arc<dyn GenerativeModel>, GenerationError> {
        tracing::info!(model = %self.config.qa_model, "Initializing QA generator");
        Ok(Arc::new(OllamaGenerativeModel::new(
            self.config.ollama_url.clone(),
            self.config.qa_model.clone(),
        )?))
    }

    fn embedder(&self) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
        tracing::info!(
            provider = ?self.config.embedding_provider,
            model = %self.config.embedding_model,
            dimension = self.config.embedding_dimension,
            "Initializing embedder"
        );
        match self.config.embedding_provider {
            EmbeddingProvider::Hash => Ok(Arc::new(HashingEmbeddingClient::new(
                self.config.embedding_dimension,
            ))),
            EmbeddingProvider::Ollama => Ok(Arc::new(OllamaEmbeddingClient::new(
                self.config.ollama_url.clone(),
                self.config.embedding_model.clone(),
                self.config.embedding_dimension,
            )?)),
        }
    }
}

/// Registry of lazily initialized model handles shared across requests.
pub struct ModelRegistry {
    factory: Option<Box<dyn ModelFactory>>,
    summarizer: OnceCell<Arc<dyn GenerativeModel>>,
    qa_generator: OnceCell<Arc<dyn GenerativeModel>>,
    embedder: OnceCell<Arc<dyn EmbeddingClient>>,
}

impl ModelRegistry {
    /// Registry that builds each model on first use through `factory`.
    pub fn new(factory: Box<dyn ModelFactory>) -> Self {
        Self {
            factory: Some(factory),
            summarizer: OnceCell::new(),
            qa_generator: OnceCell::new(),
            embedder: OnceCell::new(),
        }
    }

    /// Registry pre-populated with ready-made models.
    pub fn with_models(
        summarizer: Arc<dyn GenerativeModel>,
        qa_generator: Arc<dyn GenerativeModel>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Self {
        Self {
            factory: None,
            summarizer: OnceCell::new_with(Some(summarizer)),
            qa_generator: OnceCell::new_with(Some(qa_generator)),
            embedder: OnceCell::new_with(Some(embedder)),
        }
    }

    /// The summarization model, built on first call.
    pub async fn summarizer(&self) -> Result<Arc<dyn GenerativeModel>, GenerationError> {
        self.summarizer
            .get_or_try_init(|| async { self.factory()?.summarizer() })
            .await
            .cloned()
    }

    /// The QA generation model, built on first call.
    pub async fn qa_generator(&self) -> Result<Arc<dyn GenerativeModel>, GenerationError> {
        self.qa_generator
            .get_or_try_init(|| async { self.factory()?.qa_generator() })
            .await
            .cloned()
    }

    /// The embedder, built on first call.
    pub async fn embedder(&self) -> Result<Arc<dyn EmbeddingClient>, EmbeddingClientError> {
        self.embedder
            .get_or_try_init(|| async {
                self.factory
                    .as_deref()
                    .ok_or_else(|| {
                        EmbeddingClientError::ProviderUnavailable(
                            "no model factory registered".into(),
                        )
                    })?
                    .embedder()
            })
            .await
            .cloned()
    }

    fn factory(&self) -> Result<&dyn ModelFactory, GenerationError> {
        self.factory.as_deref().ok_or_else(|| {
            GenerationError::ProviderUnavailable("no model factory registered".into())
        })
    }
}
