//! Reply composition and shape enforcement.
//!
//! One backend call per turn, wrapped in a persona instruction that
//! carries the summaries, any retrieved snippets, and (when planned)
//! the next screening question. The raw output then gets its shape
//! repaired: markup stripped, clamped to five sentences, padded to at
//! least three with a practical tip, and closed with exactly one gentle
//! question. Shape is repairable; absence is not — a backend failure
//! here fails the turn.

use crate::llm::{GenerateOptions, LlmClient, LlmError};
use crate::screening::{ScreeningItem, ANSWER_OPTIONS};

use super::sanitize::{clamp_sentences, split_sentences, strip_markup};

const MAX_REPLY_SENTENCES: usize = 5;
const MIN_REPLY_SENTENCES: usize = 3;

const REPLY_OPTIONS: GenerateOptions = GenerateOptions {
    temperature: 0.25,
    max_tokens: 240,
};

/// Stands in when the backend's output cancels to nothing after cleanup.
const SAFE_DEFAULT_REPLY: &str = "I'm here with you. What feels hardest right now?";

/// One-time gentle framing before the very first screening question.
pub const FRAMING_LINE: &str = "To better understand how you're doing, I'd like to ask \
a few short questions about the past two weeks.";

const PERSONA_RULES: &str = r#"You are a friendly assistant who speaks like a kind friend.
Be warm, concise, and non-repetitive. Reply in 1 to 5 sentences unless asked for more.
Always try to build the conversation with the user.
Use the context only to inform your reply; do NOT quote or repeat the context, history, or user verbatim.
Never output markup or tags like <...>, <<...>>, [INST], User:, Assistant:, </s>, <s>.
Ask the screening questions naturally when ready, but never mention "PHQ-9".
Avoid medical or crisis terms unless asked.
Always end your message with one gentle question that invites a reply.
Output only your reply to the user, no prefaces or labels."#;

/// Generate and shape the reply for one turn.
pub fn compose_reply<G: LlmClient + ?Sized>(
    llm: &G,
    query: &str,
    history: &str,
    summaries: &[String],
    snippets: &[String],
    item: Option<&ScreeningItem>,
    first_ask: bool,
) -> Result<String, LlmError> {
    let instruction = build_instruction(item, first_ask, summaries, snippets, history);
    let raw = llm.generate(&instruction, query, &REPLY_OPTIONS)?;
    Ok(shape_reply(&raw, query))
}

/// Assemble the system instruction for the reply call.
///
/// Everything below the rules block is marked "for you": the model may
/// use it but must not echo it.
pub(crate) fn build_instruction(
    item: Option<&ScreeningItem>,
    first_ask: bool,
    summaries: &[String],
    snippets: &[String],
    history: &str,
) -> String {
    let summary_text = if summaries.is_empty() {
        "No previous summaries available.".to_string()
    } else {
        summaries.join("\n")
    };

    let context_text = if snippets.is_empty() {
        "(none)".to_string()
    } else {
        snippets
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let history_text = if history.trim().is_empty() {
        "(none)"
    } else {
        history
    };

    let guidance = match item {
        Some(item) => {
            let mut g = String::new();
            if first_ask {
                g.push_str(&format!("Open with: {FRAMING_LINE}\n"));
            }
            g.push_str(&format!(
                "Ask exactly this next question (one per message): \"{}\" (meaning: {}). \
                 Let the user answer with: {}.",
                item.prompt,
                item.paraphrase,
                ANSWER_OPTIONS.join(" / "),
            ));
            g
        }
        None => "No screening question this turn. Keep gently exploring how the user feels.".to_string(),
    };

    format!(
        "{PERSONA_RULES}\n\n\
         Conversation summary (for you):\n{summary_text}\n\n\
         Relevant context (for you):\n{context_text}\n\n\
         Conversation so far (for you):\n{history_text}\n\n\
         Guidance for the next turn (for you):\n{guidance}"
    )
}

/// Repair the raw output's shape without touching its substance.
pub(crate) fn shape_reply(raw: &str, user_text: &str) -> String {
    let cleaned = clamp_sentences(&strip_markup(raw), MAX_REPLY_SENTENCES);
    if cleaned.is_empty() {
        return SAFE_DEFAULT_REPLY.to_string();
    }
    let padded = ensure_min_sentences(&cleaned, user_text);
    ensure_closing_question(&padded, user_text)
}

/// Pad short replies toward the three-sentence floor with a practical,
/// non-clinical tip matched to the user's message.
fn ensure_min_sentences(text: &str, user_text: &str) -> String {
    let mut sentences = split_sentences(text);
    if sentences.len() >= MIN_REPLY_SENTENCES {
        return sentences
            .into_iter()
            .take(MAX_REPLY_SENTENCES)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let tip = practical_tip(user_text).to_string();
    if sentences.is_empty() {
        sentences.push("I'm here with you.".to_string());
    }
    if sentences.len() == 1 {
        sentences.insert(1, tip);
    } else {
        sentences.push(tip);
    }
    sentences
        .into_iter()
        .take(MAX_REPLY_SENTENCES)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Guarantee the reply ends with one soft question.
///
/// A reply that already closes on a question is kept; otherwise the
/// final slot is given to a context-aware closer, within the five
/// sentence cap.
fn ensure_closing_question(text: &str, user_text: &str) -> String {
    let sentences = split_sentences(text);
    if text.contains('?') && sentences.last().is_some_and(|s| s.ends_with('?')) {
        return sentences
            .into_iter()
            .take(MAX_REPLY_SENTENCES)
            .collect::<Vec<_>>()
            .join(" ");
    }

    let question = closing_question(user_text);
    let mut core = sentences
        .into_iter()
        .take(MAX_REPLY_SENTENCES - 1)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    if core.is_empty() {
        return question.to_string();
    }
    if !core.ends_with(['.', '!', '?']) {
        core.push('.');
    }
    format!("{core} {question}")
}

fn matches_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

/// Tiny, non-clinical, practical nudges keyed off common themes.
fn practical_tip(user_text: &str) -> &'static str {
    let lower = user_text.to_lowercase();

    if matches_any(&lower, &["workload", "project", "deadline", "assignment"]) {
        "Let's list your tasks, circle the most urgent one, and start with a tiny 10-15 minute step."
    } else if matches_any(&lower, &["sleep", "insomni", "wake", "tired at night"]) {
        "A simple wind-down routine and consistent sleep and wake times often help."
    } else if matches_any(&lower, &["focus", "concentrate", "study", "attention"]) {
        "Try a 20-minute focus block with a 5-minute break, and put your phone out of sight."
    } else if matches_any(&lower, &["anxious", "anxiety", "panic", "crowd"]) {
        "Slow box breathing (in for 4, hold 4, out 4, hold 4, for about a minute) can settle your body."
    } else if matches_any(&lower, &["appetite", "eat", "overeating", "undereating"]) {
        "Gentle, regular meals and snacks help more than chasing a perfect plan."
    } else if matches_any(&lower, &["guilt", "blame", "blaming", "mistake"]) {
        "Notice the self-talk and test it: what would you say to a friend in your shoes?"
    } else {
        "We can make this feel manageable by taking one small step at a time."
    }
}

/// Context-aware closing questions for the common themes.
fn closing_question(user_text: &str) -> &'static str {
    let lower = user_text.to_lowercase();

    if matches_any(&lower, &["sleep", "wake", "insomni"]) {
        "Would it help to try one small change for sleep tonight, like a 20-minute wind-down or a fixed lights-out?"
    } else if matches_any(&lower, &["focus", "study", "concentrate"]) {
        "Shall we pick one page or one 20-minute block to start with and see how it goes?"
    } else if matches_any(&lower, &["anxious", "crowd", "panic"]) {
        "When does the anxiety tend to spike most, and would you like to try a 60-second breathing reset together?"
    } else {
        "What would make this feel a bit lighter right now: picking one task to start, or setting a 15-minute focus block?"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use crate::screening::screening_items;

    fn sentence_count(text: &str) -> usize {
        split_sentences(text).len()
    }

    // ── shape_reply ────────────────────────────────────────────

    #[test]
    fn shaped_reply_is_one_to_five_sentences() {
        let raws = [
            "",
            "Okay.",
            "One. Two.",
            "One. Two. Three. Four. Five. Six. Seven.",
            "<<SYS>> [INST] <b>",
        ];
        for raw in raws {
            let reply = shape_reply(raw, "hello");
            let n = sentence_count(&reply);
            assert!((1..=5).contains(&n), "{n} sentences for {raw:?}");
        }
    }

    #[test]
    fn shaped_reply_always_ends_with_one_question() {
        let raws = [
            "I hear you. That sounds heavy. Thanks for telling me.",
            "Okay.",
            "",
        ];
        for raw in raws {
            let reply = shape_reply(raw, "hello");
            assert!(reply.ends_with('?'), "no closing question for {raw:?}");
            assert_eq!(reply.matches('?').count(), 1, "for {raw:?}");
        }
    }

    #[test]
    fn shaped_reply_has_no_markup_residue() {
        let raw = "<<SYS>> I hear you. [INST] That sounds hard. </s> Hang in there <thinking>.";
        let reply = shape_reply(raw, "hello");
        assert!(!reply.contains('<'));
        assert!(!reply.contains(">>"));
        assert!(!reply.to_uppercase().contains("[INST]"));
    }

    #[test]
    fn empty_output_gets_safe_default() {
        assert_eq!(shape_reply("", "hello"), SAFE_DEFAULT_REPLY);
        assert_eq!(shape_reply("  <<SYS>>  ", "hello"), SAFE_DEFAULT_REPLY);
    }

    #[test]
    fn existing_closing_question_is_kept() {
        let raw = "That sounds tough. You did a lot today. How did the evening go?";
        let reply = shape_reply(raw, "long day");
        assert_eq!(reply, raw);
    }

    #[test]
    fn overlong_reply_is_clamped_then_closed() {
        let raw = "One. Two. Three. Four. Five. Six. Seven.";
        let reply = shape_reply(raw, "hello");
        assert!(sentence_count(&reply) <= 5);
        assert!(reply.ends_with('?'));
    }

    // ── tips and closers ───────────────────────────────────────

    #[test]
    fn short_reply_gains_topic_tip() {
        let reply = shape_reply("That sounds exhausting.", "my deadline is crushing me");
        assert!(reply.contains("10-15 minute step"));
    }

    #[test]
    fn sleep_theme_gets_sleep_closer() {
        let reply = shape_reply(
            "I hear you. Rest matters a lot. We can work on it together.",
            "I cannot sleep at night",
        );
        assert!(reply.contains("sleep tonight"));
        assert!(reply.ends_with('?'));
    }

    #[test]
    fn anxiety_theme_gets_breathing_closer() {
        let reply = shape_reply(
            "That rush of worry is real. It makes sense you feel drained. You are not alone in this.",
            "I panic in crowds",
        );
        assert!(reply.contains("breathing reset"));
    }

    #[test]
    fn unmatched_theme_gets_generic_tip() {
        let reply = shape_reply("Okay.", "the weather turned cold");
        // "weather" contains "eat", which lands in the appetite theme;
        // a truly unmatched message gets the generic nudge
        let reply2 = shape_reply("Okay.", "my dog ran off");
        assert!(reply.contains("regular meals") || reply.contains("one small step"));
        assert!(reply2.contains("one small step"));
    }

    // ── instruction assembly ───────────────────────────────────

    #[test]
    fn instruction_carries_persona_and_sections() {
        let instruction = build_instruction(None, false, &[], &[], "");
        assert!(instruction.contains("kind friend"));
        assert!(instruction.contains("No previous summaries available."));
        assert!(instruction.contains("Relevant context (for you):\n(none)"));
        assert!(instruction.contains("No screening question this turn."));
    }

    #[test]
    fn instruction_includes_summaries_and_snippets() {
        let summaries = vec!["Felt low last week.".to_string()];
        let snippets = vec!["Sleep hygiene basics.".to_string()];
        let instruction = build_instruction(None, false, &summaries, &snippets, "you: hi");
        assert!(instruction.contains("Felt low last week."));
        assert!(instruction.contains("- Sleep hygiene basics."));
        assert!(instruction.contains("you: hi"));
    }

    #[test]
    fn first_ask_prepends_framing_line() {
        let item = &screening_items()[0];
        let instruction = build_instruction(Some(item), true, &[], &[], "");
        assert!(instruction.contains(FRAMING_LINE));
        assert!(instruction.contains(item.prompt));
        assert!(instruction.contains(item.paraphrase));
        assert!(instruction.contains("not at all / several days / more than half the days / nearly every day"));
    }

    #[test]
    fn later_asks_skip_framing_line() {
        let item = &screening_items()[3];
        let instruction = build_instruction(Some(item), false, &[], &[], "");
        assert!(!instruction.contains(FRAMING_LINE));
        assert!(instruction.contains(item.prompt));
    }

    // ── compose_reply ──────────────────────────────────────────

    #[test]
    fn compose_shapes_backend_output() {
        let llm = MockLlmClient::new("<<SYS>> I hear you. That sounds heavy.");
        let reply = compose_reply(&llm, "rough week", "", &[], &[], None, false).unwrap();
        assert!(!reply.contains("<<"));
        assert!(reply.ends_with('?'));
    }

    #[test]
    fn compose_propagates_backend_failure() {
        let llm = MockLlmClient::failing("gateway down");
        let result = compose_reply(&llm, "rough week", "", &[], &[], None, false);
        assert!(result.is_err());
    }
}
