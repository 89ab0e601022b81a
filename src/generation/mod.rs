//! Generative model abstraction and the Ollama-backed implementation.
//!
//! Two instances are used at runtime: a summarizer for whole-document questions and a QA
//! generator for retrieval-augmented answers. Both speak the same trait so the answer
//! synthesizer can swap in fakes during tests.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Errors surfaced while invoking a generative model.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider was unreachable or not configured.
    #[error("Generation provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate text: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Decoding parameters forwarded to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    /// Upper bound on generated tokens.
    pub max_tokens: usize,
    /// Lower bound on generated tokens, when the backend honors it.
    pub min_tokens: Option<usize>,
    /// Greedy, seeded decoding when set.
    pub deterministic: bool,
    /// Sampling temperature used when decoding is not deterministic.
    pub temperature: f32,
}

impl GenerationOptions {
    /// Bounds used for whole-document summaries.
    pub fn summary() -> Self {
        Self {
            max_tokens: 140,
            min_tokens: Some(50),
            deterministic: true,
            temperature: 0.0,
        }
    }

    /// Bounds used for retrieval-augmented answers.
    pub fn qa() -> Self {
        Self {
            max_tokens: 150,
            min_tokens: None,
            deterministic: true,
            temperature: 0.2,
        }
    }

    fn effective_temperature(&self) -> f32 {
        if self.deterministic {
            0.0
        } else {
            self.temperature
        }
    }
}

/// Request payload passed to a generative model.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Fully assembled prompt.
    pub prompt: String,
    /// Decoding parameters.
    pub options: GenerationOptions,
}

/// Interface implemented by text generation backends.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Generate text for the supplied prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn name(&self) -> &str;
}

const SEED: u64 = 42;

/// Generative model served by a local Ollama runtime through `/api/generate`.
pub struct OllamaGenerativeModel {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerativeModel {
    /// Construct a client for `model` served at `base_url`.
    pub fn new(base_url: String, model: String) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent("docqa/generate")
            .build()
            .map_err(|error| GenerationError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }

    fn payload(&self, request: &GenerationRequest) -> Value {
        let mut options = Map::new();
        options.insert("num_predict".into(), json!(request.options.max_tokens));
        options.insert(
            "temperature".into(),
            json!(request.options.effective_temperature()),
        );
        if request.options.deterministic {
            options.insert("seed".into(), json!(SEED));
        }
        if let Some(min_tokens) = request.options.min_tokens {
            // Ollama has no minimum-length knob; the bound is advisory only.
            tracing::trace!(min_tokens, "Ignoring min token bound for Ollama");
        }

        json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": Value::Object(options),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl GenerativeModel for OllamaGenerativeModel {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let payload = self.payload(&request);

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(GenerationError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}
