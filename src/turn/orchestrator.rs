//! The conversation engine facade.
//!
//! Coordinates one turn: classify stage → plan → retrieve → select
//! question → compose reply. Also fronts the batch assessment and
//! signal classification calls so callers hold a single entry point.
//!
//! Every call is stateless: the caller re-supplies transcript,
//! summaries, and asked ids each time, so concurrent requests share
//! nothing but the static question bank.

use crate::assessment::{self, AssessmentError, AssessmentResult};
use crate::config::EngineConfig;
use crate::knowledge::KnowledgeSearch;
use crate::llm::LlmClient;
use crate::screening::next_unasked;
use crate::signal::{self, SignalError, SignalResult};

use super::compose::compose_reply;
use super::planner::plan_turn;
use super::sanitize::{flatten_transcript, strip_markup, truncate_chars};
use super::stage::is_early_stage;
use super::types::{TurnRequest, TurnResult};
use super::TurnError;

/// Conversation engine over injected generation and retrieval backends.
pub struct ConversationPipeline<'a, G: LlmClient, K: KnowledgeSearch> {
    llm: &'a G,
    knowledge: &'a K,
    config: EngineConfig,
}

impl<'a, G: LlmClient, K: KnowledgeSearch> ConversationPipeline<'a, G, K> {
    pub fn new(llm: &'a G, knowledge: &'a K, config: EngineConfig) -> Self {
        Self {
            llm,
            knowledge,
            config,
        }
    }

    /// Run one conversational turn.
    ///
    /// The result names a screening question only when the plan asked
    /// for one *and* an unasked question existed; once all nine are
    /// covered the conversation continues as plain open chat.
    pub fn run_turn(&self, request: &TurnRequest) -> Result<TurnResult, TurnError> {
        let early_stage = is_early_stage(&request.history, self.config.early_stage_threshold);

        let plan = plan_turn(
            self.llm,
            &request.query,
            early_stage,
            &request.asked_item_ids,
            &request.history,
            self.config.advisory_history_chars,
        );

        let snippets = if plan.retrieve_knowledge {
            self.knowledge
                .search(&request.query, self.config.snippet_top_k)?
                .iter()
                .map(|s| strip_markup(truncate_chars(s, self.config.snippet_max_chars)))
                .collect()
        } else {
            Vec::new()
        };

        let item = if plan.ask_next_item {
            next_unasked(&request.asked_item_ids)
        } else {
            None
        };
        let first_ask = item.is_some() && request.asked_item_ids.is_empty();

        tracing::info!(
            early_stage,
            retrieve = plan.retrieve_knowledge,
            snippet_count = snippets.len(),
            item_id = item.map(|i| i.id),
            "running turn"
        );

        let reply = compose_reply(
            self.llm,
            &request.query,
            &request.history,
            &request.summaries,
            &snippets,
            item,
            first_ask,
        )?;

        Ok(TurnResult {
            reply,
            item_id: item.map(|i| i.id),
            item_prompt: item.map(|i| i.prompt.to_string()),
        })
    }

    /// Collapse a transcript into a single paragraph, words untouched.
    pub fn summarize(&self, history: &str) -> String {
        flatten_transcript(history)
    }

    /// Score a batch of free-text questionnaire answers.
    pub fn detect_level(&self, answers: &[String]) -> Result<AssessmentResult, AssessmentError> {
        assessment::detect_level(self.llm, answers)
    }

    /// Classify depression signals and dominant emotion in a transcript.
    pub fn analyze_signal(
        &self,
        history: &str,
        summary: Option<&str>,
    ) -> Result<SignalResult, SignalError> {
        signal::analyze_signal(self.llm, history, summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::knowledge::{InMemoryKnowledgeSearch, KnowledgeError};
    use crate::llm::MockLlmClient;
    use crate::screening::screening_items;
    use crate::turn::sanitize::split_sentences;

    /// Knowledge backend that always fails, for error-path tests.
    struct BrokenKnowledge;

    impl KnowledgeSearch for BrokenKnowledge {
        fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<String>, KnowledgeError> {
            Err(KnowledgeError::Connection("http://localhost:7700".into()))
        }
    }

    fn request(query: &str, history: &str, asked: &[u8]) -> TurnRequest {
        TurnRequest {
            query: query.to_string(),
            history: history.to_string(),
            summaries: vec![],
            asked_item_ids: asked.iter().copied().collect(),
        }
    }

    /// Transcript with `n` human turns.
    fn transcript(n: usize) -> String {
        (0..n)
            .map(|i| format!("you: message {i}\nbot: reply {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    const PLAN_ASK: &str = r#"{"do_retrieve": false, "do_ask_next_item": true}"#;
    const PLAN_RETRIEVE: &str = r#"{"do_retrieve": true, "do_ask_next_item": false}"#;

    #[test]
    fn early_stage_never_surfaces_an_item() {
        // advisory says ask; the rapport rule wins
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "I hear you. Exams are a lot. You are carrying plenty.".into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline
            .run_turn(&request(
                "I've been stressed about exams",
                &transcript(1),
                &[],
            ))
            .unwrap();

        assert_eq!(result.item_id, None);
        assert_eq!(result.item_prompt, None);
        assert!(result.reply.ends_with('?'));
        for item in screening_items() {
            assert!(!result.reply.contains(item.prompt));
        }
    }

    #[test]
    fn established_conversation_asks_first_item() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "Thanks for sharing that. I'd like to understand a bit more. Lately, have you found \
             little interest or pleasure in doing things?"
                .into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline
            .run_turn(&request("I'm doing okay I guess", &transcript(4), &[]))
            .unwrap();

        assert_eq!(result.item_id, Some(1));
        assert_eq!(
            result.item_prompt.as_deref(),
            Some("Little interest or pleasure in doing things")
        );
    }

    #[test]
    fn next_item_follows_canonical_order() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "Got it. Thanks for telling me. How about your sleep lately?".into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline
            .run_turn(&request("not at all", &transcript(5), &[1, 2]))
            .unwrap();

        assert_eq!(result.item_id, Some(3));
    }

    #[test]
    fn exhausted_items_mean_open_chat() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "Thanks for walking through all of that with me. It helps to see the whole picture. \
             You've been generous with your honesty."
                .into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let all: Vec<u8> = (1..=9).collect();
        let result = pipeline
            .run_turn(&request("that was all of them", &transcript(12), &all))
            .unwrap();

        assert_eq!(result.item_id, None);
        assert!(!result.reply.is_empty());
        assert!(result.reply.ends_with('?'));
    }

    #[test]
    fn retrieval_feeds_the_reply_instruction() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_RETRIEVE.into(),
            "Low mood that lingers is worth taking seriously. Small daily anchors help. \
             You deserve support with this."
                .into(),
        ]);
        let mut knowledge = InMemoryKnowledgeSearch::new();
        knowledge.add("Persistent low mood affects sleep and appetite.");
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline
            .run_turn(&request(
                "what does persistent low mood mean",
                &transcript(2),
                &[],
            ))
            .unwrap();

        assert!(!result.reply.is_empty());
        assert_eq!(result.item_id, None);
    }

    #[test]
    fn retrieval_failure_fails_the_turn() {
        let llm = MockLlmClient::with_responses(vec![PLAN_RETRIEVE.into()]);
        let knowledge = BrokenKnowledge;
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline.run_turn(&request("tell me about low mood", &transcript(2), &[]));
        assert!(matches!(result, Err(TurnError::Knowledge(_))));
    }

    #[test]
    fn backend_failure_fails_the_turn() {
        let llm = MockLlmClient::failing("bad gateway");
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline.run_turn(&request("hello", &transcript(4), &[]));
        assert!(matches!(result, Err(TurnError::Generation(_))));
    }

    #[test]
    fn reply_shape_holds_through_the_pipeline() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "<<SYS>> Short. [INST]".into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let result = pipeline
            .run_turn(&request("hello there", &transcript(4), &[]))
            .unwrap();

        let n = split_sentences(&result.reply).len();
        assert!((1..=5).contains(&n));
        assert!(result.reply.ends_with('?'));
        assert!(!result.reply.contains("<<"));
    }

    #[test]
    fn custom_threshold_is_honored() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "Thanks for saying that. It matters. I'm listening.".into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let config = EngineConfig {
            early_stage_threshold: 9,
            ..EngineConfig::default()
        };
        let pipeline = ConversationPipeline::new(&llm, &knowledge, config);

        // 8 human turns would pass the default threshold but not this one
        let result = pipeline
            .run_turn(&request("still here", &transcript(8), &[]))
            .unwrap();
        assert_eq!(result.item_id, None);
    }

    #[test]
    fn asked_ids_are_never_mutated() {
        let llm = MockLlmClient::with_responses(vec![
            PLAN_ASK.into(),
            "Noted. Thank you for that. It helps.".into(),
        ]);
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        let req = request("several days", &transcript(5), &[1, 2, 3]);
        let before: HashSet<u8> = req.asked_item_ids.clone();
        pipeline.run_turn(&req).unwrap();
        assert_eq!(req.asked_item_ids, before);
    }

    #[test]
    fn summarize_flattens_the_transcript() {
        let llm = MockLlmClient::new("unused");
        let knowledge = InMemoryKnowledgeSearch::new();
        let pipeline = ConversationPipeline::new(&llm, &knowledge, EngineConfig::default());

        assert_eq!(
            pipeline.summarize("you: hi\r\nbot: hello\nyou: bye"),
            "you: hi bot: hello you: bye"
        );
    }
}
