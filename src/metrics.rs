use crate::rag::{AnswerOutcome, Mode};
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and question-answering activity.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_indexed: AtomicU64,
    chunks_indexed: AtomicU64,
    last_chunk_size: AtomicU64,
    questions_answered: AtomicU64,
    summary_answers: AtomicU64,
    short_circuits: AtomicU64,
    model_fallbacks: AtomicU64,
    non_answers: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an indexed document, the chunks produced for it, and the chunk size used.
    pub fn record_document(&self, chunk_count: u64, chunk_size: u64) {
        self.documents_indexed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_size.store(chunk_size, Ordering::Relaxed);
    }

    /// Record a returned answer and the path that produced it.
    pub fn record_answer(&self, mode: Mode, outcome: AnswerOutcome) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
        if mode == Mode::Summary {
            self.summary_answers.fetch_add(1, Ordering::Relaxed);
        }
        let counter = match outcome {
            AnswerOutcome::ShortCircuited | AnswerOutcome::NoDocument => &self.short_circuits,
            AnswerOutcome::ExtractiveFallback | AnswerOutcome::ModelFailure => {
                &self.model_fallbacks
            }
            AnswerOutcome::NonAnswer => &self.non_answers,
            AnswerOutcome::Summarized | AnswerOutcome::Answered => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_chunk_size = self.last_chunk_size.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_indexed: self.documents_indexed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            last_chunk_size: (last_chunk_size > 0).then_some(last_chunk_size),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            summary_answers: self.summary_answers.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            model_fallbacks: self.model_fallbacks.load(Ordering::Relaxed),
            non_answers: self.non_answers.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents that have been indexed since startup.
    pub documents_indexed: u64,
    /// Total chunk count produced across all indexed documents.
    pub chunks_indexed: u64,
    /// Chunk size used for the most recent document, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_size: Option<u64>,
    /// Questions answered through any path.
    pub questions_answered: u64,
    /// Questions routed to the summarizer.
    pub summary_answers: u64,
    /// Answers returned without calling a model.
    pub short_circuits: u64,
    /// Answers produced after a model failure.
    pub model_fallbacks: u64,
    /// Model outputs normalized to "I don't know.".
    pub non_answers: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = ServiceMetrics::new();
        metrics.record_document(2, 500);
        metrics.record_document(3, 256);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_indexed, 2);
        assert_eq!(snapshot.chunks_indexed, 5);
        assert_eq!(snapshot.last_chunk_size, Some(256));
    }

    #[test]
    fn answers_are_bucketed_by_outcome() {
        let metrics = ServiceMetrics::new();
        metrics.record_answer(Mode::Summary, AnswerOutcome::Summarized);
        metrics.record_answer(Mode::Summary, AnswerOutcome::ExtractiveFallback);
        metrics.record_answer(Mode::Qa, AnswerOutcome::ShortCircuited);
        metrics.record_answer(Mode::Qa, AnswerOutcome::NonAnswer);
        metrics.record_answer(Mode::Qa, AnswerOutcome::ModelFailure);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.questions_answered, 5);
        assert_eq!(snapshot.summary_answers, 2);
        assert_eq!(snapshot.short_circuits, 1);
        assert_eq!(snapshot.model_fallbacks, 2);
        assert_eq!(snapshot.non_answers, 1);
    }

    #[test]
    fn empty_snapshot_omits_chunk_size() {
        let snapshot = ServiceMetrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
        let json = serde_json::to_value(snapshot).expect("json");
        assert!(json.get("last_chunk_size").is_none());
    }
}
