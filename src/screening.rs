//! The screening question bank.
//!
//! Nine symptom-frequency items asked one per turn once the conversation
//! has moved past its rapport stage. Each item carries the canonical
//! wording plus a softer paraphrase the reply composer can lean on. The
//! catalog is fixed at compile time and never mutated.

use std::collections::HashSet;

/// One item of the nine-item symptom questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreeningItem {
    /// Stable 1-based id, also the canonical ask order.
    pub id: u8,
    /// Canonical item wording.
    pub prompt: &'static str,
    /// Supportive paraphrase used to soften the ask.
    pub paraphrase: &'static str,
}

/// Answer vocabulary offered with every screening question.
pub const ANSWER_OPTIONS: &[&str] = &[
    "not at all",
    "several days",
    "more than half the days",
    "nearly every day",
];

const ITEMS: &[ScreeningItem] = &[
    ScreeningItem {
        id: 1,
        prompt: "Little interest or pleasure in doing things",
        paraphrase: "Have you been feeling uninterested or not enjoying things lately?",
    },
    ScreeningItem {
        id: 2,
        prompt: "Feeling down, depressed, or hopeless",
        paraphrase: "Have you been feeling really low, sad, or like there's no hope?",
    },
    ScreeningItem {
        id: 3,
        prompt: "Trouble falling or staying asleep, or sleeping too much",
        paraphrase: "Are you having problems with sleep, like too little or too much?",
    },
    ScreeningItem {
        id: 4,
        prompt: "Feeling tired or having little energy",
        paraphrase: "Do you feel exhausted or low on energy most of the time?",
    },
    ScreeningItem {
        id: 5,
        prompt: "Poor appetite or overeating",
        paraphrase: "Have your eating habits changed, like eating too little or too much?",
    },
    ScreeningItem {
        id: 6,
        prompt: "Feeling bad about yourself, or that you are a failure or have let yourself or your family down",
        paraphrase: "Do you often feel worthless or like you've disappointed others?",
    },
    ScreeningItem {
        id: 7,
        prompt: "Trouble concentrating on things, such as reading the newspaper or watching TV",
        paraphrase: "Is it hard to focus on simple tasks like reading or watching shows?",
    },
    ScreeningItem {
        id: 8,
        prompt: "Moving or speaking slowly, or being fidgety or restless",
        paraphrase: "Do you notice that you've been physically restless or unusually slow?",
    },
    ScreeningItem {
        id: 9,
        prompt: "Thoughts that you would be better off dead or of hurting yourself",
        paraphrase: "Have you had any thoughts about harming yourself or not wanting to live?",
    },
];

/// The full item catalog in canonical order.
pub fn screening_items() -> &'static [ScreeningItem] {
    ITEMS
}

/// The lowest-id item not yet asked, or `None` once all nine are covered.
///
/// Pure and idempotent: the caller accumulates asked ids across turns and
/// re-supplies them on every request.
pub fn next_unasked(asked: &HashSet<u8>) -> Option<&'static ScreeningItem> {
    ITEMS.iter().find(|item| !asked.contains(&item.id))
}
