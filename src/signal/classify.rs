//! Depression-signal and emotion classification.
//!
//! One structured call over the combined transcript and summary. Fields
//! are normalized individually (boolean-like tokens coerced, confidences
//! clamped, unknown emotions read as neutral) so a sloppy but
//! recognizable response still classifies; only output with no object
//! structure at all is rejected, and there is no further fallback.

use serde_json::Value;

use crate::llm::json::coerce_bool;
use crate::llm::{GenerateOptions, LlmClient, LlmError};

use super::{EmotionLabel, SignalError, SignalLabel, SignalResult};

const SIGNAL_OPTIONS: GenerateOptions = GenerateOptions {
    temperature: 0.0,
    max_tokens: 300,
};

const CLASSIFIER_SYSTEM: &str = "You are a careful mental-health signal classifier. \
You DO NOT diagnose. Output STRICT JSON only, no extra text.";

const DEFAULT_CONFIDENCE: u8 = 50;

/// Classify depression signals and the dominant emotion in a transcript.
pub fn analyze_signal<G: LlmClient + ?Sized>(
    llm: &G,
    history: &str,
    summary: Option<&str>,
) -> Result<SignalResult, SignalError> {
    let mut text = history.trim().to_string();
    if let Some(summary) = summary.map(str::trim).filter(|s| !s.is_empty()) {
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        text.push_str(summary);
    }

    let prompt = format!(
        r#"Analyze the following conversation material for *signals* of depression (not a diagnosis) and the dominant emotion.

TEXT:
{text}

Return JSON with this exact schema:
{{
  "depression": {{
    "detected": true,
    "confidence": 0
  }},
  "emotion": {{
    "label": "happy|neutral|sad|angry|fearful",
    "confidence": 0
  }},
  "rationale": "one concise sentence explaining your reasoning"
}}
"detected" is true if signs of depression are present, else false.
"confidence" is an integer 0-100 for your detected/not-detected choice.
Only JSON. No extra words."#
    );

    let value = llm
        .generate_json(CLASSIFIER_SYSTEM, &prompt, &SIGNAL_OPTIONS)
        .map_err(|e| match e {
            LlmError::ResponseParsing(m) => SignalError::MalformedResponse(m),
            other => SignalError::Generation(other),
        })?;

    Ok(normalize(&value))
}

/// Field-by-field normalization of the classifier's object.
fn normalize(value: &Value) -> SignalResult {
    let depression = value.get("depression");
    let emotion = value.get("emotion");

    let detected = depression
        .and_then(|d| d.get("detected"))
        .map(|v| coerce_bool(v, false))
        .unwrap_or(false);

    let raw_confidence = clamp_confidence(depression.and_then(|d| d.get("confidence")));

    // Always report confidence toward the "detected" pole: low confidence
    // in a "not detected" finding reads as high confidence away from it.
    let confidence_detected = if detected {
        raw_confidence
    } else {
        100 - raw_confidence
    };

    let emotion_label = emotion
        .and_then(|e| e.get("label"))
        .and_then(Value::as_str)
        .map(EmotionLabel::parse_or_neutral)
        .unwrap_or(EmotionLabel::Neutral);

    let emotion_confidence = clamp_confidence(emotion.and_then(|e| e.get("confidence")));

    let rationale = value
        .get("rationale")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    tracing::debug!(
        detected,
        confidence_detected,
        emotion = emotion_label.as_str(),
        "signal classification normalized"
    );

    SignalResult {
        depression: if detected {
            SignalLabel::Detected
        } else {
            SignalLabel::NotDetected
        },
        confidence_detected,
        emotion: emotion_label,
        emotion_confidence,
        rationale,
    }
}

/// Clamp a confidence value to 0..=100, defaulting on parse failure.
fn clamp_confidence(value: Option<&Value>) -> u8 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) => v.clamp(0.0, 100.0).round() as u8,
        None => DEFAULT_CONFIDENCE,
    }
}
