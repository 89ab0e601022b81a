//! Shared data types for the question-answering pipeline.

use crate::config::{Config, SummarySource};
use crate::generation::GenerationError;
use crate::index::RetrievedPassage;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Canonical answer text returned on the degraded paths.
pub mod messages {
    /// Summary requested before any document was uploaded.
    pub const NO_DOCUMENT: &str = "No document uploaded.";
    /// Latest document held no text.
    pub const EMPTY_DOCUMENT: &str = "Document is empty.";
    /// Cleaned document text too short to summarize.
    pub const SUMMARY_UNAVAILABLE: &str =
        "Unable to generate a meaningful summary from this document.";
    /// Retrieval produced nothing usable.
    pub const INSUFFICIENT_INFORMATION: &str =
        "I don't have enough information to answer this question.";
    /// Model declined to answer from the context.
    pub const DONT_KNOW: &str = "I don't know.";
    /// QA model failed.
    pub const GENERATION_FAILED: &str =
        "There was an error generating an answer. Please try rephrasing your question.";
}

/// Phrases in QA output that mean the model could not answer.
pub const NON_ANSWER_MARKERS: &[&str] = &[
    "i don't know",
    "not mentioned",
    "no information",
    "not provided in the context",
    "cannot be determined",
];

/// Maximum characters kept per source snippet.
pub const SOURCE_SNIPPET_CHARS: usize = 200;
/// Cleaned text shorter than this is not worth sending to a model.
pub const MIN_CONTEXT_CHARS: usize = 20;
/// Sentences the extractive summary fallback keeps.
pub const EXTRACTIVE_SENTENCES: usize = 3;
/// Sentences must be longer than this to appear in the extractive fallback.
pub const EXTRACTIVE_MIN_SENTENCE_CHARS: usize = 20;
/// Query used to pull broad passages when summaries are sourced from the index.
pub const BROAD_TOPIC_QUERY: &str = "main content key information";
/// Passages fetched for the broad-topic query.
pub const BROAD_TOPIC_K: usize = 10;

/// How an [`Answer`] was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Summarizer produced the answer.
    Summarized,
    /// Summarizer failed and leading sentences were returned instead.
    ExtractiveFallback,
    /// QA model produced a grounded answer.
    Answered,
    /// QA model declined to answer.
    NonAnswer,
    /// Answered without calling a model.
    ShortCircuited,
    /// QA model failed.
    ModelFailure,
    /// Summary requested with no document available.
    NoDocument,
}

impl AnswerOutcome {
    /// Lowercase label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            AnswerOutcome::Summarized => "summarized",
            AnswerOutcome::ExtractiveFallback => "extractive_fallback",
            AnswerOutcome::Answered => "answered",
            AnswerOutcome::NonAnswer => "non_answer",
            AnswerOutcome::ShortCircuited => "short_circuited",
            AnswerOutcome::ModelFailure => "model_failure",
            AnswerOutcome::NoDocument => "no_document",
        }
    }
}

/// Response returned for every question, whatever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Answer text.
    pub answer: String,
    /// Truncated passages backing a QA answer; empty otherwise.
    pub sources: Vec<String>,
    /// Path taken to produce the answer.
    #[serde(skip)]
    pub outcome: AnswerOutcome,
}

impl Answer {
    /// Answer without sources.
    pub fn bare(answer: impl Into<String>, outcome: AnswerOutcome) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            outcome,
        }
    }
}

/// Bounded context assembled from retrieved passages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    /// Cleaned passages joined by newlines.
    pub text: String,
    /// Passages that contributed to `text`, in rank order.
    pub passages: Vec<RetrievedPassage>,
}

/// Why a model invocation did not yield usable text.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Model could not be built or returned an error.
    #[error(transparent)]
    Model(#[from] GenerationError),
    /// Model did not answer within the configured timeout.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    /// Model returned only whitespace.
    #[error("model returned empty output")]
    EmptyOutput,
}

/// Tunables for the question-answering pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct RagSettings {
    /// Passages retrieved per QA question.
    pub retrieval_k: usize,
    /// Maximum source snippets attached to a QA answer.
    pub max_sources: usize,
    /// Where summary text comes from.
    pub summary_source: SummarySource,
    /// Character cap on summary input.
    pub summary_context_chars: usize,
    /// Character cap on QA context.
    pub qa_context_chars: usize,
    /// Deadline for a single model call.
    pub model_timeout: Duration,
}

impl RagSettings {
    /// Settings derived from the process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            retrieval_k: config.retrieval_k,
            max_sources: config.max_sources,
            summary_source: config.summary_source,
            summary_context_chars: config.summary_context_chars,
            qa_context_chars: config.qa_context_chars,
            model_timeout: Duration::from_secs(config.model_timeout_secs),
        }
    }
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            retrieval_k: 3,
            max_sources: 3,
            summary_source: SummarySource::LatestUpload,
            summary_context_chars: 900,
            qa_context_chars: 1024,
            model_timeout: Duration::from_secs(60),
        }
    }
}
