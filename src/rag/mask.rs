//! Best-effort masking of personal details before text is sent to a summarizer.

use regex::Regex;
use std::sync::LazyLock;

static FULL_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+\b").expect("valid name pattern"));

// The separator is mandatory so words such as "idea" are never touched.
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:ID|Id|id)(?:[ \t]*[:#][ \t]*|[ \t]+)[A-Za-z0-9]+(?:-[A-Za-z0-9]+)*\b")
        .expect("valid identifier pattern")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b").expect("valid date pattern")
});

static YOU_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\byou\b").expect("valid pronoun pattern"));

static YOUR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\byour\b").expect("valid pronoun pattern"));

/// Replace full names, identifiers, numeric dates, and second-person pronouns.
///
/// Substitutions are all lowercase, so a later rule can never produce text matching an
/// earlier one.
pub fn mask(text: &str) -> String {
    let masked = FULL_NAME_RE.replace_all(text, "the candidate");
    let masked = IDENTIFIER_RE.replace_all(&masked, "an identifier");
    let masked = DATE_RE.replace_all(&masked, "a date");
    let masked = YOU_RE.replace_all(&masked, "the recipient");
    YOUR_RE.replace_all(&masked, "their").into_owned()
}
