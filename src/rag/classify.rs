//! Keyword-based document type detection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse document category used to pick a summary instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Academic or technical paper.
    ResearchPaper,
    /// Offer letters and other employment paperwork.
    EmploymentDocument,
    /// Bills and invoices.
    Invoice,
    /// Correspondence.
    LetterOrEmail,
    /// Anything without a stronger signal.
    Generic,
}

/// Keyword tables checked in priority order; the first table with a hit wins.
pub const CLASSIFICATION_RULES: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::ResearchPaper,
        &["abstract", "introduction", "methodology", "references"],
    ),
    (
        DocumentType::EmploymentDocument,
        &["offer letter", "letter of intent", "employment", "joining"],
    ),
    (DocumentType::Invoice, &["invoice", "amount due", "bill to"]),
    (
        DocumentType::LetterOrEmail,
        &["dear", "regards", "sincerely"],
    ),
];

impl DocumentType {
    /// Every variant, in classification priority order.
    pub const ALL: [DocumentType; 5] = [
        DocumentType::ResearchPaper,
        DocumentType::EmploymentDocument,
        DocumentType::Invoice,
        DocumentType::LetterOrEmail,
        DocumentType::Generic,
    ];

    /// Stable snake_case label.
    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentType::ResearchPaper => "research_paper",
            DocumentType::EmploymentDocument => "employment_document",
            DocumentType::Invoice => "invoice",
            DocumentType::LetterOrEmail => "letter_or_email",
            DocumentType::Generic => "generic",
        }
    }

    /// Parse a label, treating anything unrecognized as [`DocumentType::Generic`].
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == label)
            .unwrap_or(DocumentType::Generic)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assign a [`DocumentType`] from case-insensitive keyword signals in `text`.
pub fn classify(text: &str) -> DocumentType {
    let lowered = text.to_lowercase();
    CLASSIFICATION_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
        .map(|(kind, _)| *kind)
        .unwrap_or(DocumentType::Generic)
}
