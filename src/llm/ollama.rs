//! Self-hosted model server client (Ollama HTTP API).
//!
//! Prefers `/api/chat` so the system/user split is honored by the chat
//! template. When chat yields empty text the call falls back to
//! `/api/generate` with an inline system wrapper, which relies on the
//! Modelfile template instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json::recover_object;
use super::types::{GenerateOptions, LlmClient};
use super::LlmError;

/// Token sequences the model must stop at. Fine-tuned checkpoints leak
/// chat-template residue without these.
const TAG_STOPS: &[&str] = &[
    "</s>",
    "<s>",
    "[INST]",
    "[/INST]",
    "<<",
    "<USER",
    "User:",
    "Assistant:",
    "\nUser",
    "\nAssistant",
];

const NUM_CTX: u32 = 4096;
const TOP_P: f32 = 0.9;
const REPEAT_PENALTY_TEXT: f32 = 1.2;
const REPEAT_PENALTY_JSON: f32 = 1.1;

/// HTTP client for a self-hosted Ollama instance.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for `model` served at `base_url`.
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        }
    }

    /// Default local instance on the standard port, 120s timeout.
    pub fn default_local(model: &str) -> Self {
        Self::new("http://localhost:11434", model, 120)
    }

    /// The model this client generates with.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::Timeout(self.timeout_secs)
        } else {
            LlmError::HttpClient(e.to_string())
        }
    }

    fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))
    }

    fn chat(&self, system: &str, user: &str, opts: &GenerateOptions) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
            options: SamplingOptions::text(opts),
        };

        let parsed: ChatResponse = self.post("/api/chat", &body)?;
        Ok(parsed
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default())
    }

    fn completion(
        &self,
        prompt: &str,
        format: Option<&str>,
        options: SamplingOptions,
    ) -> Result<String, LlmError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
            options,
        };

        let parsed: GenerateResponse = self.post("/api/generate", &body)?;
        Ok(parsed.response.unwrap_or_default().trim().to_string())
    }
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        system: &str,
        user: &str,
        opts: &GenerateOptions,
    ) -> Result<String, LlmError> {
        let reply = self.chat(system, user, opts)?;
        if !reply.is_empty() {
            return Ok(reply);
        }

        tracing::debug!(model = %self.model, "chat endpoint returned empty text, retrying via generate");
        let prompt = wrap_system(system, user);
        let reply = self.completion(&prompt, None, SamplingOptions::text(opts))?;
        if reply.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(reply)
    }

    fn generate_json(
        &self,
        system: &str,
        user: &str,
        opts: &GenerateOptions,
    ) -> Result<Value, LlmError> {
        let prompt = wrap_system(system, user);
        let raw = self.completion(&prompt, Some("json"), SamplingOptions::json(opts))?;
        recover_object(&raw)
            .ok_or_else(|| LlmError::ResponseParsing(format!("no JSON object in: {raw}")))
    }
}

/// Inline system wrapper for the bare completion endpoint.
fn wrap_system(system: &str, user: &str) -> String {
    format!("<<SYS>>\n{system}\n<</SYS>>\n\n{user}")
}

#[derive(Serialize)]
struct SamplingOptions {
    num_ctx: u32,
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    stop: &'static [&'static str],
}

impl SamplingOptions {
    fn text(opts: &GenerateOptions) -> Self {
        Self {
            num_ctx: NUM_CTX,
            num_predict: opts.max_tokens,
            temperature: opts.temperature,
            top_p: TOP_P,
            repeat_penalty: REPEAT_PENALTY_TEXT,
            stop: TAG_STOPS,
        }
    }

    fn json(opts: &GenerateOptions) -> Self {
        Self {
            repeat_penalty: REPEAT_PENALTY_JSON,
            ..Self::text(opts)
        }
    }
}

/// Request body for `/api/chat`.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Response body from `/api/chat`.
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Request body for `/api/generate`.
#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: SamplingOptions,
}

/// Response body from `/api/generate`.
#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}
