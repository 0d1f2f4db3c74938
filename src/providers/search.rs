//! Search engine clients (Tavily, SerpAPI) behind the `SearchClient` trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::SearchEngine;
use crate::config::Settings;
use crate::error::{ConfigError, WorkflowError};

/// Results requested per query from each engine.
const RESULTS_PER_QUERY: u32 = 5;
const SEARCH_TIMEOUT_SECS: u64 = 30;

/// A raw search result. `query` and `provider` are filled in by the
/// execution layer after the engine returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub provider: String,
}

/// Opaque search capability: query string in, ranked hits out.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, WorkflowError>;
}

pub fn search_client(
    settings: &Settings,
    engine: SearchEngine,
) -> Result<Arc<dyn SearchClient>, WorkflowError> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
        .build()
        .map_err(|e| WorkflowError::SearchTool {
            engine: "http_client".to_string(),
            message: e.to_string(),
        })?;
    match engine {
        SearchEngine::Tavily => {
            let api_key = settings
                .tavily_api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingCredential("TAVILY_API_KEY".to_string()))?;
            Ok(Arc::new(TavilyClient { http, api_key }))
        }
        SearchEngine::SerpApi => {
            let api_key = settings
                .serp_api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingCredential("SERP_API_KEY".to_string()))?;
            Ok(Arc::new(SerpApiClient { http, api_key }))
        }
    }
}

pub struct TavilyClient {
    http: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl SearchClient for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, WorkflowError> {
        let body = json!({
            "query": query,
            "max_results": RESULTS_PER_QUERY,
            "include_answer": true,
            "include_raw_content": true,
        });

        let response = self
            .http
            .post("https://api.tavily.com/search")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::SearchTool {
                engine: "tavily".to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::SearchTool {
                engine: "tavily".to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| WorkflowError::SearchTool {
                engine: "tavily".to_string(),
                message: e.to_string(),
            })?;
        let results = payload
            .get("results")
            .and_then(|v| v.as_array())
            .ok_or_else(|| WorkflowError::SearchTool {
                engine: "tavily".to_string(),
                message: "missing results array".to_string(),
            })?;

        Ok(results.iter().filter_map(parse_tavily_row).collect())
    }
}

fn parse_tavily_row(row: &Value) -> Option<SearchHit> {
    let url = row.get("url")?.as_str()?.trim().to_string();
    if url.is_empty() {
        return None;
    }
    Some(SearchHit {
        title: row
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("Untitled")
            .to_string(),
        url,
        content: row
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        query: String::new(),
        provider: String::new(),
    })
}

/// SerpAPI returns only organic-result snippets and never propagates errors
/// past its own boundary: failures are logged and an empty list returned, so
/// a dual-search run degrades instead of aborting.
pub struct SerpApiClient {
    http: reqwest::Client,
    api_key: String,
}

#[async_trait]
impl SearchClient for SerpApiClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, WorkflowError> {
        match self.organic_results(query).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                tracing::error!(query = %query, error = %e, "serpapi search failed");
                Ok(Vec::new())
            }
        }
    }
}

impl SerpApiClient {
    async fn organic_results(&self, query: &str) -> Result<Vec<SearchHit>, WorkflowError> {
        let response = self
            .http
            .get("https://serpapi.com/search.json")
            .query(&[
                ("engine", "google"),
                ("q", query),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| WorkflowError::SearchTool {
                engine: "serpapi".to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::SearchTool {
                engine: "serpapi".to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| WorkflowError::SearchTool {
                engine: "serpapi".to_string(),
                message: e.to_string(),
            })?;
        let organic = payload
            .get("organic_results")
            .and_then(|v| v.as_array())
            .map(|arr| arr.as_slice())
            .unwrap_or(&[]);

        Ok(organic
            .iter()
            .take(RESULTS_PER_QUERY as usize)
            .filter_map(parse_serp_row)
            .collect())
    }
}

fn parse_serp_row(row: &Value) -> Option<SearchHit> {
    let url = row.get("link")?.as_str()?.trim().to_string();
    if url.is_empty() {
        return None;
    }
    Some(SearchHit {
        title: row
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        url,
        content: row
            .get("snippet")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        query: String::new(),
        provider: String::new(),
    })
}
