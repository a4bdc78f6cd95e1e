pub mod extract;

pub use extract::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum AssessmentError {
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("malformed assessment output: {0}")]
    MalformedResponse(String),

    #[error("could not parse score and level from fallback output: {0}")]
    UnparsableFallback(String),
}

/// Severity bands reported for a completed questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeverityLevel {
    Minimal,
    Mild,
    Moderate,
    #[serde(rename = "Moderately Severe")]
    ModeratelySevere,
    Severe,
}

impl SeverityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Minimal => "Minimal",
            SeverityLevel::Mild => "Mild",
            SeverityLevel::Moderate => "Moderate",
            SeverityLevel::ModeratelySevere => "Moderately Severe",
            SeverityLevel::Severe => "Severe",
        }
    }

    /// Parse a level name leniently (case and spacing variations).
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_lowercase().as_str() {
            "minimal" => Some(SeverityLevel::Minimal),
            "mild" => Some(SeverityLevel::Mild),
            "moderate" => Some(SeverityLevel::Moderate),
            "moderately severe" | "moderatelysevere" => Some(SeverityLevel::ModeratelySevere),
            "severe" => Some(SeverityLevel::Severe),
            _ => None,
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score and severity band for one batch of nine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub total_score: u8,
    pub level: SeverityLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_leniently() {
        assert_eq!(SeverityLevel::parse("minimal"), Some(SeverityLevel::Minimal));
        assert_eq!(
            SeverityLevel::parse("Moderately  Severe"),
            Some(SeverityLevel::ModeratelySevere)
        );
        assert_eq!(
            SeverityLevel::parse("MODERATELYSEVERE"),
            Some(SeverityLevel::ModeratelySevere)
        );
        assert_eq!(SeverityLevel::parse("catastrophic"), None);
    }

    #[test]
    fn level_serializes_with_display_text() {
        let json = serde_json::to_string(&SeverityLevel::ModeratelySevere).unwrap();
        assert_eq!(json, "\"Moderately Severe\"");
        let back: SeverityLevel = serde_json::from_str("\"Moderately Severe\"").unwrap();
        assert_eq!(back, SeverityLevel::ModeratelySevere);
    }

    #[test]
    fn result_round_trips() {
        let result = AssessmentResult {
            total_score: 14,
            level: SeverityLevel::Moderate,
        };
        let json = serde_json::to_string(&result).unwrap();
        let back: AssessmentResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
