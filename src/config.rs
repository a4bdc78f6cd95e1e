//! Engine configuration.
//!
//! All orchestration knobs live in one explicit struct handed to the
//! pipeline at construction time. Backend endpoints, model names, and
//! timeouts are constructor parameters of the concrete clients instead;
//! core logic never reads the process environment.

use serde::{Deserialize, Serialize};

/// Tunable parameters for the conversation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The conversation counts as rapport-building while the number of
    /// human transcript lines is below this. Screening questions are
    /// withheld during that stage.
    pub early_stage_threshold: usize,
    /// Maximum knowledge snippets retrieved per turn.
    pub snippet_top_k: usize,
    /// Per-snippet character cap before the snippet enters the prompt.
    pub snippet_max_chars: usize,
    /// Tail of the transcript (in characters) fed to the advisory
    /// planning prompt. Bounds the cost of the planning call.
    pub advisory_history_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            early_stage_threshold: 3,
            snippet_top_k: 3,
            snippet_max_chars: 500,
            advisory_history_chars: 1500,
        }
    }
}
