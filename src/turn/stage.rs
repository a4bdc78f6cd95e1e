//! Rapport-stage classification.
//!
//! Screening questions are withheld while the conversation is still
//! young. The only signal is how many transcript lines the human has
//! contributed; one case-insensitive tag match serves every call site.

/// Speaker tags that mark a transcript line as the human's.
const HUMAN_TAGS: &[&str] = &["you:", "user:"];

/// Count transcript lines attributable to the human participant.
///
/// Malformed or untagged input counts as zero human turns.
pub fn human_turn_count(history: &str) -> usize {
    history
        .lines()
        .filter(|line| {
            let lower = line.trim_start().to_lowercase();
            HUMAN_TAGS.iter().any(|tag| lower.starts_with(tag))
        })
        .count()
}

/// True while the human has spoken fewer than `threshold` times.
pub fn is_early_stage(history: &str, threshold: usize) -> bool {
    human_turn_count(history) < threshold
}
