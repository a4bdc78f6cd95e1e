//! Knowledge retrieval for grounding replies.
//!
//! A similarity-search service holds the supporting corpus; each turn
//! that wants factual grounding asks it for the top-k snippets. No
//! session state is carried between requests, so one request's failure
//! never corrupts another's.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("retrieval backend is not reachable at {0}")]
    Connection(String),

    #[error("retrieval request timed out after {0}s")]
    Timeout(u64),

    #[error("retrieval backend returned error (status {status}): {body}")]
    Backend { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("response parsing error: {0}")]
    ResponseParsing(String),
}

/// Similarity search abstraction (allows mocking and backend swaps).
///
/// Returns up to `top_k` snippets ranked by similarity. A failure is an
/// error, never an empty result set.
pub trait KnowledgeSearch {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, KnowledgeError>;
}

/// HTTP client for a hosted similarity-search index.
pub struct HttpKnowledgeSearch {
    base_url: String,
    index: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpKnowledgeSearch {
    pub fn new(base_url: &str, index: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            client,
            timeout_secs,
        }
    }

    /// The index this client searches.
    pub fn index(&self) -> &str {
        &self.index
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    index: &'a str,
    query: &'a str,
    k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<String>,
}

impl KnowledgeSearch for HttpKnowledgeSearch {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, KnowledgeError> {
        let url = format!("{}/search", self.base_url);
        let body = SearchRequest {
            index: &self.index,
            query,
            k: top_k,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    KnowledgeError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    KnowledgeError::Timeout(self.timeout_secs)
                } else {
                    KnowledgeError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(KnowledgeError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response
            .json()
            .map_err(|e| KnowledgeError::ResponseParsing(e.to_string()))?;

        tracing::debug!(count = parsed.results.len(), index = %self.index, "knowledge search complete");

        Ok(parsed.results.into_iter().take(top_k).collect())
    }
}

/// In-memory index for testing — ranks seeded snippets by word overlap
/// with the query.
#[derive(Default)]
pub struct InMemoryKnowledgeSearch {
    snippets: Vec<String>,
}

impl InMemoryKnowledgeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, snippet: &str) {
        self.snippets.push(snippet.to_string());
    }

    fn overlap(query: &str, snippet: &str) -> usize {
        let needle: Vec<String> = query
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|w| w.len() >= 3)
            .collect();
        let haystack = snippet.to_lowercase();
        needle.iter().filter(|w| haystack.contains(w.as_str())).count()
    }
}

impl KnowledgeSearch for InMemoryKnowledgeSearch {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, KnowledgeError> {
        let mut scored: Vec<(usize, &String)> = self
            .snippets
            .iter()
            .map(|s| (Self::overlap(query, s), s))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(top_k).map(|(_, s)| s.clone()).collect())
    }
}
