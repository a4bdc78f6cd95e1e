pub mod json;
pub mod types;
pub mod ollama;
pub mod hosted;

pub use types::*;
pub use ollama::*;
pub use hosted::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("generation backend is not reachable at {0}")]
    Connection(String),

    #[error("generation request timed out after {0}s")]
    Timeout(u64),

    #[error("generation backend returned error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("response parsing error: {0}")]
    ResponseParsing(String),

    #[error("generation backend returned empty output")]
    EmptyResponse,
}
