//! Reply and transcript normalization.
//!
//! Fine-tuned checkpoints leak chat-template residue (`<<SYS>>`,
//! `[INST]`, stray tags); everything user-facing passes through here
//! before shape enforcement.

use std::sync::LazyLock;

use regex::Regex;

static DOUBLE_ANGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<[^>]*>>").expect("valid regex"));
static ANGLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static INST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[/?INST\]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Remove markup/control-token residue and collapse whitespace runs.
pub fn strip_markup(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let text = DOUBLE_ANGLE_RE.replace_all(text, " ");
    let text = ANGLE_RE.replace_all(&text, " ");
    let text = INST_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

/// Split text into sentences on terminal punctuation followed by
/// whitespace, keeping the punctuation with its sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.trim().chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let last = current.trim().to_string();
    if !last.is_empty() {
        sentences.push(last);
    }
    sentences
}

/// Keep only the first `max` sentences.
pub fn clamp_sentences(text: &str, max: usize) -> String {
    split_sentences(text)
        .into_iter()
        .take(max)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Join a multi-line transcript into one paragraph without altering the
/// words themselves.
pub fn flatten_transcript(history: &str) -> String {
    history.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
