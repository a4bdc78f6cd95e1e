pub mod classify;

pub use classify::*;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum SignalError {
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("malformed signal output: {0}")]
    MalformedResponse(String),
}

/// Published verdict on depression signals in a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalLabel {
    Detected,
    NotDetected,
}

impl fmt::Display for SignalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignalLabel::Detected => "Detected",
            SignalLabel::NotDetected => "NotDetected",
        })
    }
}

/// Dominant emotion over the analyzed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Happy,
    Neutral,
    Sad,
    Angry,
    Fearful,
}

impl EmotionLabel {
    /// Parse a label leniently; anything unrecognized reads as neutral.
    pub fn parse_or_neutral(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "happy" => EmotionLabel::Happy,
            "sad" => EmotionLabel::Sad,
            "angry" => EmotionLabel::Angry,
            "fearful" => EmotionLabel::Fearful,
            _ => EmotionLabel::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Neutral => "neutral",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Fearful => "fearful",
        }
    }
}

/// Result of one signal classification call.
///
/// `confidence_detected` always measures confidence toward the
/// "signs detected" pole, whichever way the model's judgment leaned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalResult {
    pub depression: SignalLabel,
    pub confidence_detected: u8,
    pub emotion: EmotionLabel,
    pub emotion_confidence: u8,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_label_display_literals() {
        assert_eq!(SignalLabel::Detected.to_string(), "Detected");
        assert_eq!(SignalLabel::NotDetected.to_string(), "NotDetected");
    }

    #[test]
    fn emotion_parses_leniently() {
        assert_eq!(EmotionLabel::parse_or_neutral(" SAD "), EmotionLabel::Sad);
        assert_eq!(EmotionLabel::parse_or_neutral("Fearful"), EmotionLabel::Fearful);
        assert_eq!(EmotionLabel::parse_or_neutral("ecstatic"), EmotionLabel::Neutral);
        assert_eq!(EmotionLabel::parse_or_neutral(""), EmotionLabel::Neutral);
    }

    #[test]
    fn emotion_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&EmotionLabel::Angry).unwrap(), "\"angry\"");
    }
}
