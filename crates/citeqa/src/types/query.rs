//! Question request types

use serde::{Deserialize, Serialize};

/// Question submitted over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The question to answer
    pub question: String,

    /// Candidates fetched per phrasing (falls back to `retrieval.top_k`)
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Whether to generate alternate phrasings (falls back to `retrieval.query_expansion`)
    #[serde(default)]
    pub query_expansion: Option<bool>,
}

impl AskRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
            query_expansion: None,
        }
    }

    /// Validate the request
    pub fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question is empty".to_string());
        }
        if self.top_k == Some(0) {
            return Err("top_k must be at least 1".to_string());
        }
        if self.top_k.is_some_and(|k| k > 50) {
            return Err("top_k must be at most 50".to_string());
        }
        Ok(())
    }
}

/// Query string of `GET /api/search`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    pub q: String,

    /// Hits to return
    #[serde(default = "default_search_k")]
    pub k: usize,
}

fn default_search_k() -> usize {
    20
}

impl SearchParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.q.trim().is_empty() {
            return Err("q is empty".to_string());
        }
        if !(1..=50).contains(&self.k) {
            return Err("k must be between 1 and 50".to_string());
        }
        Ok(())
    }
}
