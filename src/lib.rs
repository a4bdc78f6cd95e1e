//! Amica — a conversational screening companion engine.
//!
//! Interleaves warm open-ended chat with a structured nine-item symptom
//! questionnaire. On every user message the engine decides whether to
//! retrieve supporting knowledge, whether the conversation is ready for
//! the next screening question, which question that is, and how to keep
//! the reply short, non-repetitive, and closed with exactly one gentle
//! question. Separate calls score a completed answer batch and classify
//! depression signals and dominant emotion in a transcript.
//!
//! The engine is stateless across requests: the caller supplies the
//! transcript, rolling summaries, and already-asked question ids every
//! time. The generation and retrieval backends are injected behind the
//! [`llm::LlmClient`] and [`knowledge::KnowledgeSearch`] traits; a
//! self-hosted model server and a hosted chat API ship as
//! interchangeable generation variants.

pub mod assessment;
pub mod config;
pub mod knowledge;
pub mod llm;
pub mod screening;
pub mod signal;
pub mod turn;

pub use assessment::{AssessmentError, AssessmentResult, SeverityLevel};
pub use config::EngineConfig;
pub use knowledge::{HttpKnowledgeSearch, InMemoryKnowledgeSearch, KnowledgeError, KnowledgeSearch};
pub use llm::{GenerateOptions, HostedChatClient, LlmClient, LlmError, MockLlmClient, OllamaClient};
pub use screening::{next_unasked, screening_items, ScreeningItem, ANSWER_OPTIONS};
pub use signal::{EmotionLabel, SignalError, SignalLabel, SignalResult};
pub use turn::{ConversationPipeline, TurnError, TurnPlan, TurnRequest, TurnResult};
