//! Question intent routing.

use serde::Serialize;

/// Phrases that mark a question as a request for a whole-document summary.
pub const SUMMARY_TRIGGERS: &[&str] = &[
    "what is this pdf about",
    "what is this document about",
    "what is this paper about",
    "what is this file about",
    "tell me about this",
    "tell me about",
    "summary",
    "summarize",
    "summarise",
    "overview",
];

/// How a question will be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Summarize the most recent document.
    Summary,
    /// Retrieval-augmented answer.
    Qa,
}

impl Mode {
    /// Lowercase label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Summary => "summary",
            Mode::Qa => "qa",
        }
    }
}

/// Route a question to [`Mode::Summary`] when it contains any summary trigger phrase.
pub fn route(question: &str) -> Mode {
    let lowered = question.to_lowercase();
    if SUMMARY_TRIGGERS
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        Mode::Summary
    } else {
        Mode::Qa
    }
}
