use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One conversational turn, as supplied by the caller.
///
/// The engine is stateless across requests: the caller accumulates the
/// transcript, rolling summaries, and the set of already-asked question
/// ids, and re-supplies all of them on every call. Asked ids only ever
/// grow; the engine never removes one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRequest {
    /// What the user just said.
    pub query: String,
    /// Free-text transcript of the conversation so far.
    pub history: String,
    /// Rolling summaries of earlier sessions, oldest first.
    #[serde(default)]
    pub summaries: Vec<String>,
    /// Ids of screening questions already asked.
    #[serde(default)]
    pub asked_item_ids: HashSet<u8>,
}

/// What this turn should do, decided per turn and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPlan {
    /// Fetch supporting knowledge snippets for the reply.
    pub retrieve_knowledge: bool,
    /// Surface the next unasked screening question.
    pub ask_next_item: bool,
}

/// The engine's answer for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    /// The reply to show the user. Always present.
    pub reply: String,
    /// Id of the screening question surfaced this turn, if any.
    pub item_id: Option<u8>,
    /// Canonical wording of that question, if any.
    pub item_prompt: Option<String>,
}
