//! Per-turn planning.
//!
//! The backend gets an advisory vote on whether to retrieve knowledge
//! and whether to surface the next screening question. The vote is never
//! authoritative: parsing failures collapse to a deterministic default,
//! and the rapport-stage rule overrides whatever the advisory step said.

use std::collections::HashSet;

use crate::llm::json::{coerce_bool, recover_object};
use crate::llm::{GenerateOptions, LlmClient};

use super::types::TurnPlan;

const PLAN_OPTIONS: GenerateOptions = GenerateOptions {
    temperature: 0.2,
    max_tokens: 160,
};

const PLANNER_SYSTEM: &str = "You are a planner helping a caring companion \
chatbot decide what to do next. Return STRICT JSON only, no extra text.";

/// Decide what this turn should do.
///
/// Advisory failures of any kind (backend down, prose instead of JSON)
/// degrade to the default plan; they are never surfaced. The hard rule
/// that no screening question is asked during the rapport stage is
/// applied after every plan source, advisory or default.
pub fn plan_turn<G: LlmClient + ?Sized>(
    llm: &G,
    query: &str,
    early_stage: bool,
    asked: &HashSet<u8>,
    history: &str,
    advisory_history_chars: usize,
) -> TurnPlan {
    let prompt = advisory_prompt(query, early_stage, asked, history, advisory_history_chars);

    let mut plan = match llm.generate(PLANNER_SYSTEM, &prompt, &PLAN_OPTIONS) {
        Ok(raw) => match recover_object(&raw) {
            Some(value) => TurnPlan {
                retrieve_knowledge: value
                    .get("do_retrieve")
                    .map(|v| coerce_bool(v, false))
                    .unwrap_or(false),
                ask_next_item: value
                    .get("do_ask_next_item")
                    .map(|v| coerce_bool(v, !early_stage))
                    .unwrap_or(!early_stage),
            },
            None => {
                tracing::debug!("advisory plan was not parseable, using default plan");
                default_plan(early_stage)
            }
        },
        Err(e) => {
            tracing::debug!(error = %e, "advisory plan call failed, using default plan");
            default_plan(early_stage)
        }
    };

    // Non-negotiable: no screening before rapport is established.
    if early_stage {
        plan.ask_next_item = false;
    }
    plan
}

fn default_plan(early_stage: bool) -> TurnPlan {
    TurnPlan {
        retrieve_knowledge: false,
        ask_next_item: !early_stage,
    }
}

fn advisory_prompt(
    query: &str,
    early_stage: bool,
    asked: &HashSet<u8>,
    history: &str,
    advisory_history_chars: usize,
) -> String {
    let mut asked_ids: Vec<u8> = asked.iter().copied().collect();
    asked_ids.sort_unstable();

    format!(
        r#"Return STRICT JSON with keys:
- "do_retrieve": boolean (should we retrieve knowledge for this turn?)
- "do_ask_next_item": boolean (should we ask the next screening question now?)

Guidelines:
- While the user is still opening up in the first turns, keep it light and do NOT start the questionnaire yet.
- After the early stage, go through the questionnaire sequentially, one question per turn, unless the user clearly shifts to topics that need knowledge.
- Retrieve only if the user asks for information or advice that benefits from factual context.

User query: "{query}"
Early stage: {early_stage}
Asked question ids: {asked_ids:?}
History (truncated): {tail}"#,
        tail = tail_chars(history, advisory_history_chars),
    )
}

/// Last `n` characters of `text`, cut on a char boundary.
fn tail_chars(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    text.char_indices()
        .nth(count - n)
        .map(|(idx, _)| &text[idx..])
        .unwrap_or(text)
}
