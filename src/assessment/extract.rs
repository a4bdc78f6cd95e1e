//! Score and severity extraction from free-text questionnaire answers.
//!
//! Primary path asks the backend for strict JSON and validates it
//! field by field. Any primary failure, backend errors included, drops
//! to a plain-text prompt demanding an exact two-line format that is
//! then pattern-matched. There is no third path: an unparsable fallback
//! is a terminal failure for the call.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::llm::{GenerateOptions, LlmClient};

use super::{AssessmentError, AssessmentResult, SeverityLevel};

const MAX_TOTAL_SCORE: u8 = 27;

const PRIMARY_OPTIONS: GenerateOptions = GenerateOptions {
    temperature: 0.2,
    max_tokens: 200,
};

const FALLBACK_OPTIONS: GenerateOptions = GenerateOptions {
    temperature: 0.0,
    max_tokens: 120,
};

const SCORER_SYSTEM: &str = "You score symptom questionnaires from free-text \
answers. Output exactly what is asked for, nothing else.";

// Fallback format:
//   PHQ-9 Score: 26
//   Depression Level: Severe
static SCORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)PHQ-9\s*Score\s*:\s*(\d{1,2})").expect("valid regex"));
static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Depression\s*Level\s*:\s*(Moderately\s+Severe|Minimal|Mild|Moderate|Severe)")
        .expect("valid regex")
});

/// Score a batch of free-text answers, in item order.
///
/// Blank entries keep their item position but are left out of the
/// numbered prompt, so a partially answered batch still scores.
pub fn detect_level<G: LlmClient + ?Sized>(
    llm: &G,
    answers: &[String],
) -> Result<AssessmentResult, AssessmentError> {
    let numbered = numbered_answers(answers);

    match structured_extraction(llm, &numbered) {
        Ok(result) => Ok(result),
        Err(e) => {
            tracing::debug!(error = %e, "structured extraction failed, trying text fallback");
            text_fallback(llm, &numbered)
        }
    }
}

fn numbered_answers(answers: &[String]) -> String {
    answers
        .iter()
        .enumerate()
        .filter(|(_, a)| !a.trim().is_empty())
        .map(|(i, a)| format!("{}. {}", i + 1, a.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Deserialize)]
struct RawAssessment {
    total_score: i64,
    level: String,
}

fn structured_extraction<G: LlmClient + ?Sized>(
    llm: &G,
    numbered: &str,
) -> Result<AssessmentResult, AssessmentError> {
    let prompt = format!(
        r#"Analyze the following questionnaire responses and output ONLY JSON with:
- "total_score": integer 0..27
- "level": one of ["Minimal","Mild","Moderate","Moderately Severe","Severe"]

Responses (in order):
{numbered}"#
    );

    let value = llm.generate_json(SCORER_SYSTEM, &prompt, &PRIMARY_OPTIONS)?;

    let raw: RawAssessment = serde_json::from_value(value)
        .map_err(|e| AssessmentError::MalformedResponse(e.to_string()))?;

    let total_score = u8::try_from(raw.total_score)
        .ok()
        .filter(|s| *s <= MAX_TOTAL_SCORE)
        .ok_or_else(|| {
            AssessmentError::MalformedResponse(format!("score out of range: {}", raw.total_score))
        })?;

    let level = SeverityLevel::parse(&raw.level)
        .ok_or_else(|| AssessmentError::MalformedResponse(format!("unknown level: {}", raw.level)))?;

    Ok(AssessmentResult { total_score, level })
}

fn text_fallback<G: LlmClient + ?Sized>(
    llm: &G,
    numbered: &str,
) -> Result<AssessmentResult, AssessmentError> {
    let prompt = format!(
        r#"Analyze the following questionnaire responses and provide the score and depression level.

{numbered}

Respond EXACTLY in this format (no extra words):
PHQ-9 Score: <number>
Depression Level: <Minimal|Mild|Moderate|Moderately Severe|Severe>"#
    );

    let text = llm.generate(SCORER_SYSTEM, &prompt, &FALLBACK_OPTIONS)?;
    parse_fallback_text(&text)
}

/// Parse the exact two-line fallback format.
fn parse_fallback_text(text: &str) -> Result<AssessmentResult, AssessmentError> {
    let score = SCORE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok())
        .filter(|s| *s <= MAX_TOTAL_SCORE);

    let level = LEVEL_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| SeverityLevel::parse(m.as_str()));

    match (score, level) {
        (Some(total_score), Some(level)) => Ok(AssessmentResult { total_score, level }),
        _ => Err(AssessmentError::UnparsableFallback(
            text.chars().take(200).collect(),
        )),
    }
}
