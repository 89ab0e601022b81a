//! Answer synthesis: prompt assembly, model invocation, and the fallback policy.
//!
//! Every path returns a well-formed [`Answer`]. Model failures (errors, timeouts, empty output)
//! surface as [`SynthesisError`] from [`AnswerSynthesizer::invoke`] and are turned into either an
//! extractive summary or a canned retry message. Nothing is retried.

use super::classify::classify;
use super::mask::mask;
use super::normalize::normalize;
use super::prompt::{build_qa_prompt, build_summary_prompt};
use super::retrieval::{SummaryInput, truncate_chars};
use super::types::{
    Answer, AnswerOutcome, Context, EXTRACTIVE_MIN_SENTENCE_CHARS, EXTRACTIVE_SENTENCES,
    MIN_CONTEXT_CHARS, NON_ANSWER_MARKERS, RagSettings, SOURCE_SNIPPET_CHARS, SynthesisError,
    messages,
};
use crate::generation::{GenerationOptions, GenerationRequest};
use crate::registry::ModelRegistry;
use std::sync::Arc;

/// Which model a prompt is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Whole-document summarizer.
    Summarizer,
    /// Retrieval-augmented QA generator.
    QaGenerator,
}

/// Turns prepared text into answers using the models held by a [`ModelRegistry`].
pub struct AnswerSynthesizer {
    registry: Arc<ModelRegistry>,
    settings: RagSettings,
}

impl AnswerSynthesizer {
    /// Construct a synthesizer sharing `registry`.
    pub fn new(registry: Arc<ModelRegistry>, settings: RagSettings) -> Self {
        Self { registry, settings }
    }

    /// Summarize a document.
    pub async fn summarize(&self, input: SummaryInput) -> Answer {
        let raw = match input {
            SummaryInput::NoDocument => {
                return Answer::bare(messages::NO_DOCUMENT, AnswerOutcome::NoDocument);
            }
            SummaryInput::Empty => {
                return Answer::bare(messages::EMPTY_DOCUMENT, AnswerOutcome::ShortCircuited);
            }
            SummaryInput::Text(text) if text.trim().is_empty() => {
                return Answer::bare(messages::EMPTY_DOCUMENT, AnswerOutcome::ShortCircuited);
            }
            SummaryInput::Text(text) => text,
        };

        let doc_type = classify(&raw);
        let cleaned = normalize(&raw);
        if cleaned.chars().count() < MIN_CONTEXT_CHARS {
            tracing::info!(%doc_type, chars = cleaned.chars().count(), "Summary input too short");
            return Answer::bare(messages::SUMMARY_UNAVAILABLE, AnswerOutcome::ShortCircuited);
        }

        let masked = mask(&cleaned);
        let prompt = build_summary_prompt(doc_type, &masked);
        tracing::debug!(%doc_type, prompt_chars = prompt.chars().count(), "Invoking summarizer");

        match self
            .invoke(ModelRole::Summarizer, prompt, GenerationOptions::summary())
            .await
        {
            Ok(summary) => Answer::bare(ensure_terminal_period(summary), AnswerOutcome::Summarized),
            Err(error) => {
                tracing::warn!(%error, %doc_type, "Summarizer failed; using extractive fallback");
                let fallback = extractive_summary(&masked);
                if fallback.is_empty() {
                    Answer::bare(messages::SUMMARY_UNAVAILABLE, AnswerOutcome::ExtractiveFallback)
                } else {
                    Answer::bare(fallback, AnswerOutcome::ExtractiveFallback)
                }
            }
        }
    }

    /// Answer `question` from `context`.
    ///
    /// The QA model is not called when the context has no passages or is too short.
    pub async fn answer(&self, question: &str, context: &Context) -> Answer {
        if context.passages.is_empty() || context.text.chars().count() < MIN_CONTEXT_CHARS {
            tracing::info!(
                passages = context.passages.len(),
                context_chars = context.text.chars().count(),
                "Insufficient context; skipping QA model"
            );
            return Answer::bare(
                messages::INSUFFICIENT_INFORMATION,
                AnswerOutcome::ShortCircuited,
            );
        }

        let prompt = build_qa_prompt(&context.text, question);
        match self
            .invoke(ModelRole::QaGenerator, prompt, GenerationOptions::qa())
            .await
        {
            Ok(output) if is_non_answer(&output) => {
                Answer::bare(messages::DONT_KNOW, AnswerOutcome::NonAnswer)
            }
            Ok(output) => Answer {
                answer: output,
                sources: source_snippets(context, self.settings.max_sources),
                outcome: AnswerOutcome::Answered,
            },
            Err(error) => {
                tracing::warn!(%error, "QA generation failed");
                Answer::bare(messages::GENERATION_FAILED, AnswerOutcome::ModelFailure)
            }
        }
    }

    /// Send `prompt` to the model for `role`, bounded by the configured timeout.
    ///
    /// Returns trimmed, non-empty model output.
    pub async fn invoke(
        &self,
        role: ModelRole,
        prompt: String,
        options: GenerationOptions,
    ) -> Result<String, SynthesisError> {
        let model = match role {
            ModelRole::Summarizer => self.registry.summarizer().await?,
            ModelRole::QaGenerator => self.registry.qa_generator().await?,
        };

        let timeout = self.settings.model_timeout;
        let request = GenerationRequest { prompt, options };
        let output = tokio::time::timeout(timeout, model.generate(request))
            .await
            .map_err(|_| SynthesisError::Timeout(timeout))??;

        let trimmed = output.trim();
        if trimmed.is_empty() {
            return Err(SynthesisError::EmptyOutput);
        }
        tracing::debug!(model = model.name(), ?role, chars = trimmed.len(), "Model responded");
        Ok(trimmed.to_string())
    }
}

/// Whether QA output is a refusal to answer.
pub fn is_non_answer(output: &str) -> bool {
    let lowered = output.to_lowercase();
    NON_ANSWER_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
}

/// First sentences of `text` long enough to carry content, period-terminated.
pub fn extractive_summary(text: &str) -> String {
    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() > EXTRACTIVE_MIN_SENTENCE_CHARS)
        .take(EXTRACTIVE_SENTENCES)
        .collect();

    if sentences.is_empty() {
        return String::new();
    }
    let mut summary = sentences.join(". ");
    summary.push('.');
    summary
}

fn ensure_terminal_period(mut text: String) -> String {
    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

fn source_snippets(context: &Context, max_sources: usize) -> Vec<String> {
    context
        .passages
        .iter()
        .take(max_sources)
        .map(|passage| truncate_chars(passage.text.trim(), SOURCE_SNIPPET_CHARS))
        .collect()
}
