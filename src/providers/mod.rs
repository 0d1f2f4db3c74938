//! Model and search provider capabilities.
//!
//! Providers are reached over plain HTTPS with `reqwest` and parsed as
//! `serde_json::Value`; no vendor SDK crates. The `ModelClient` and
//! `SearchClient` traits are the seams tests mock out.

pub mod model;
pub mod search;

pub use self::model::{invoke_guarded, model_client, ChatMessage, ModelClient};
pub use self::search::{search_client, SearchClient, SearchHit};

use serde::{Deserialize, Serialize};

/// Model backend. Gemini falls back to OpenAI when its credential is absent;
/// OpenAI has no fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Gemini,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }

    /// Gemini is subject to quota-driven timeouts and output-size limits.
    pub fn is_quota_limited(&self) -> bool {
        matches!(self, Self::Gemini)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Web search engine. Tavily is mandatory; SerpAPI is optional and only used
/// in dual-search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Tavily,
    SerpApi,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tavily => "tavily",
            Self::SerpApi => "serpapi",
        }
    }
}

impl std::fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
