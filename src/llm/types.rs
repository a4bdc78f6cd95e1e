use std::cell::RefCell;
use std::collections::VecDeque;

use serde_json::Value;

use super::json::recover_object;
use super::LlmError;

/// Sampling knobs for a single generation call.
///
/// Call sites own their operating points as constants; there is no
/// ambient default temperature.
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    pub temperature: f32,
    /// Output token budget for the call.
    pub max_tokens: u32,
}

impl GenerateOptions {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Generation backend abstraction (allows mocking and backend swaps).
///
/// Implementations take a system instruction and a user message and
/// return either free text or a JSON object the backend was constrained
/// to produce. A hosted chat API and a self-hosted model server are the
/// two shipped variants.
pub trait LlmClient {
    fn generate(
        &self,
        system: &str,
        user: &str,
        opts: &GenerateOptions,
    ) -> Result<String, LlmError>;

    /// Request schema-constrained output and return the parsed object.
    ///
    /// Implementations decode strictly first and then run the bounded
    /// lenient recovery from [`super::json`]; output that yields no
    /// object at all is a parsing error.
    fn generate_json(
        &self,
        system: &str,
        user: &str,
        opts: &GenerateOptions,
    ) -> Result<Value, LlmError>;
}

/// Mock backend for testing.
///
/// Returns scripted responses in order; the last response repeats once
/// the script is exhausted, so multi-call flows can share one mock.
pub struct MockLlmClient {
    responses: RefCell<VecDeque<String>>,
    failure: Option<String>,
}

impl MockLlmClient {
    /// Mock that always answers with `response`.
    pub fn new(response: &str) -> Self {
        Self::with_responses(vec![response.to_string()])
    }

    /// Mock that answers with each response in turn.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            failure: None,
        }
    }

    /// Mock whose every call fails as an unreachable backend.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: RefCell::new(VecDeque::new()),
            failure: Some(message.to_string()),
        }
    }

    fn next_response(&self) -> Result<String, LlmError> {
        if let Some(message) = &self.failure {
            return Err(LlmError::Connection(message.clone()));
        }
        let mut queue = self.responses.borrow_mut();
        if queue.len() > 1 {
            Ok(queue.pop_front().unwrap_or_default())
        } else {
            queue.front().cloned().ok_or(LlmError::EmptyResponse)
        }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _system: &str,
        _user: &str,
        _opts: &GenerateOptions,
    ) -> Result<String, LlmError> {
        self.next_response()
    }

    fn generate_json(
        &self,
        _system: &str,
        _user: &str,
        _opts: &GenerateOptions,
    ) -> Result<Value, LlmError> {
        let raw = self.next_response()?;
        recover_object(&raw)
            .ok_or_else(|| LlmError::ResponseParsing(format!("no JSON object in: {raw}")))
    }
}
