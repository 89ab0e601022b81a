//! Document loaders turning uploaded files into raw text.

use super::types::ExtractionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File extensions accepted for upload.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Converts a document on disk into raw text.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Extract the full text of the document at `path`.
    async fn load(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Loader for PDF files, with plain-text passthrough for `.txt` and `.md`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl PdfLoader {
    /// Construct a new loader.
    pub const fn new() -> Self {
        Self
    }
}

/// Whether `path` carries one of the [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

#[async_trait]
impl DocumentLoader for PdfLoader {
    async fn load(&self, path: &Path) -> Result<String, ExtractionError> {
        let extension = extension_of(path).unwrap_or_default();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let text = match extension.as_str() {
            "pdf" => extract_pdf(path.to_path_buf(), bytes).await?,
            "txt" | "md" => String::from_utf8_lossy(&bytes).into_owned(),
            other => return Err(ExtractionError::UnsupportedType(other.to_string())),
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty(path.to_path_buf()));
        }

        tracing::debug!(
            path = %path.display(),
            chars = text.chars().count(),
            "Extracted document text"
        );
        Ok(text)
    }
}

async fn extract_pdf(path: PathBuf, bytes: Vec<u8>) -> Result<String, ExtractionError> {
    let parse_path = path.clone();
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&bytes).map_err(|error| ExtractionError::Parse {
            path: parse_path,
            message: error.to_string(),
        })
    })
    .await
    .map_err(|error| ExtractionError::Parse {
        path,
        message: format!("extraction task failed: {error}"),
    })?
}
