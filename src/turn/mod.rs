pub mod types;
pub mod stage;
pub mod sanitize;
pub mod planner;
pub mod compose;
pub mod orchestrator;

pub use types::*;
pub use orchestrator::*;

use thiserror::Error;

use crate::knowledge::KnowledgeError;
use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("reply generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("knowledge retrieval failed: {0}")]
    Knowledge(#[from] KnowledgeError),
}
