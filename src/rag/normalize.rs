//! Text cleanup applied before anything reaches a prompt.
//!
//! [`normalize`] strips transport noise (links, addresses, mail headers, sign-offs) while
//! keeping line structure. [`extract_meaningful_content`] goes further and keeps only sentences
//! that look like prose, which is what retrieved passages need before they are stitched into a
//! QA context.

use regex::Regex;
use std::sync::LazyLock;

/// Sentences shorter than this many characters are dropped as fragments.
pub const MIN_SENTENCE_CHARS: usize = 15;
/// Filtered output shorter than this falls back to the lightly cleaned text.
pub const MIN_MEANINGFUL_CHARS: usize = 50;

/// Case-insensitive phrases marking a sentence as boilerplate.
pub const NOISE_PHRASES: &[&str] = &[
    "unsubscribe",
    "click here",
    "all rights reserved",
    "privacy policy",
    "view in browser",
    "this email was sent",
    "do not reply",
    "confidentiality notice",
    "terms and conditions",
    "copyright",
    "sent from my",
];

const MAX_NORMALIZE_PASSES: usize = 16;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("valid url pattern"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}")
        .expect("valid email pattern")
});

static HEADER_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:From|To|Subject|Date|Cc|CC|Bcc|BCC|Sent|Reply-To):[^\n]*$")
        .expect("valid header pattern")
});

static BOILERPLATE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // Unsubscribe and mailing-list footers.
        r"(?im)^[^\n]*\bunsubscribe\b[^\n]*$",
        r"(?im)^[^\n]*\byou are receiving this (?:email|message)\b[^\n]*$",
        // Committee sign-offs such as "The Organizing Committee".
        r"(?im)^[ \t]*(?:the[ \t]+)?(?:[a-z]+[ \t]+){0,3}committee[ \t]*$",
        // Closings, alone on a line.
        r"(?im)^[ \t]*(?:best|kind|warm|warmest)?[ \t]*regards,?[ \t]*$",
        r"(?im)^[ \t]*(?:thanks and regards|thanks & regards|yours sincerely|sincerely|yours truly|best wishes|many thanks|cheers),?[ \t]*$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid boilerplate pattern"))
    .collect()
});

static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid sentence pattern"));

/// Strip links, addresses, header lines, and boilerplate, then collapse whitespace.
///
/// Whitespace runs containing a newline become a single `\n`; other runs become one space.
/// The result is a fixed point: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let mut current = normalize_once(text);
    for _ in 0..MAX_NORMALIZE_PASSES {
        let next = normalize_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn normalize_once(text: &str) -> String {
    let stripped = URL_RE.replace_all(text, "");
    let stripped = EMAIL_RE.replace_all(&stripped, "");
    let mut stripped = HEADER_LINE_RE.replace_all(&stripped, "").into_owned();
    for pattern in BOILERPLATE_RES.iter() {
        stripped = pattern.replace_all(&stripped, "").into_owned();
    }
    collapse_whitespace(&stripped)
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<char> = None;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending = match (pending, ch) {
                (Some('\n'), _) | (_, '\n') => Some('\n'),
                _ => Some(' '),
            };
        } else {
            if let Some(separator) = pending.take() {
                if !out.is_empty() {
                    out.push(separator);
                }
            }
            out.push(ch);
        }
    }

    out
}

/// Remove links and collapse every whitespace run to a single space.
pub fn clean_text_light(text: &str) -> String {
    let stripped = URL_RE.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep only prose-like sentences from `text`.
///
/// Sentences are split on `.`, `!` and `?`. Fragments, sentences carrying a
/// [`NOISE_PHRASES`] entry, and sentences without letters are discarded. When fewer than
/// [`MIN_MEANINGFUL_CHARS`] survive, the lightly cleaned input is returned instead so callers
/// never receive a degenerate string for non-empty input.
pub fn extract_meaningful_content(text: &str) -> String {
    let normalized = normalize(text);
    let sentences: Vec<&str> = SENTENCE_SPLIT_RE
        .split(&normalized)
        .map(str::trim)
        .filter(|sentence| is_meaningful_sentence(sentence))
        .collect();

    let joined = if sentences.is_empty() {
        String::new()
    } else {
        let mut joined = sentences.join(". ");
        joined.push('.');
        // Line breaks inside a sentence carry no meaning once sentences are rejoined.
        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    };

    if joined.chars().count() < MIN_MEANINGFUL_CHARS {
        return clean_text_light(text);
    }
    joined
}

fn is_meaningful_sentence(sentence: &str) -> bool {
    if sentence.chars().count() < MIN_SENTENCE_CHARS {
        return false;
    }
    if !sentence.chars().any(char::is_alphabetic) {
        return false;
    }
    let lowered = sentence.to_lowercase();
    !NOISE_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}
