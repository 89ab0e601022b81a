use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document QA server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory receiving uploaded documents.
    pub upload_dir: PathBuf,
    /// Directory holding the persisted vector index.
    pub index_dir: PathBuf,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime serving embeddings and generation.
    pub ollama_url: String,
    /// Model used for whole-document summaries.
    pub summarization_model: String,
    /// Model used for retrieval-augmented answers.
    pub qa_model: String,
    /// Upper bound for a single chunk, measured in `chunk_unit`.
    pub chunk_size: usize,
    /// Overlap carried from the previous chunk, measured in `chunk_unit`.
    pub chunk_overlap: usize,
    /// Unit used to measure chunk sizes.
    pub chunk_unit: ChunkUnit,
    /// Number of passages retrieved for a specific question.
    pub retrieval_k: usize,
    /// Maximum number of source snippets returned with an answer.
    pub max_sources: usize,
    /// Where summary-mode questions read their document text from.
    pub summary_source: SummarySource,
    /// Character cap applied to summary input.
    pub summary_context_chars: usize,
    /// Character cap applied to the QA prompt context.
    pub qa_context_chars: usize,
    /// Time budget for a single model call, in seconds.
    pub model_timeout_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Deterministic in-process hashing embedder; needs no runtime.
    Hash,
    /// Local Ollama runtime.
    Ollama,
}

/// Unit used when measuring chunk sizes and overlaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    /// Unicode scalar values.
    Characters,
    /// `cl100k_base` BPE tokens.
    Tokens,
}

/// Source of the text summarized for "what is this about" questions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    /// Re-extract the most recently modified file in the upload directory.
    LatestUpload,
    /// Approximate the document with a broad, high-k index query.
    Index,
}

const DEFAULT_UPLOAD_DIR: &str = "data/uploads";
const DEFAULT_INDEX_DIR: &str = "data/index";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";
const DEFAULT_GENERATION_MODEL: &str = "llama3.2";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            upload_dir: load_env_optional("UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.into())
                .into(),
            index_dir: load_env_optional("INDEX_DIR")
                .unwrap_or_else(|| DEFAULT_INDEX_DIR.into())
                .into(),
            embedding_provider: parse_env_or("EMBEDDING_PROVIDER", EmbeddingProvider::Hash)?,
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            embedding_dimension: parse_env_or("EMBEDDING_DIMENSION", 384)?,
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.into()),
            summarization_model: load_env_optional("SUMMARIZATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.into()),
            qa_model: load_env_optional("QA_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.into()),
            chunk_size: parse_env_or("CHUNK_SIZE", 500)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", 100)?,
            chunk_unit: parse_env_or("CHUNK_UNIT", ChunkUnit::Characters)?,
            retrieval_k: parse_env_or("RETRIEVAL_K", 3)?,
            max_sources: parse_env_or("MAX_SOURCES", 3)?,
            summary_source: parse_env_or("SUMMARY_SOURCE", SummarySource::LatestUpload)?,
            summary_context_chars: parse_env_or("SUMMARY_CONTEXT_CHARS", 900)?,
            qa_context_chars: parse_env_or("QA_CONTEXT_CHARS", 1024)?,
            model_timeout_secs: parse_env_or("MODEL_TIMEOUT_SECS", 60)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if self.retrieval_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_K".into()));
        }
        Ok(())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hash" => Ok(Self::Hash),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for ChunkUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "characters" | "chars" => Ok(Self::Characters),
            "tokens" => Ok(Self::Tokens),
            _ => Err(()),
        }
    }
}

impl FromStr for SummarySource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latest_upload" | "latest-upload" => Ok(Self::LatestUpload),
            "index" => Ok(Self::Index),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        upload_dir = %config.upload_dir.display(),
        index_dir = %config.index_dir.display(),
        embedding_provider = ?config.embedding_provider,
        summary_source = ?config.summary_source,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
