//! Shared test doubles: scripted model clients and deterministic search
//! backends, wired in through the `Capabilities` seam.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use researchd::config::Settings;
use researchd::error::WorkflowError;
use researchd::providers::{
    ChatMessage, ModelClient, Provider, SearchClient, SearchEngine, SearchHit,
};
use researchd::workflow::Capabilities;

/// Model that replies with pre-scripted responses in order. Panics if the
/// script runs dry, which keeps call-count assumptions honest.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, WorkflowError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.expect("scripted model ran out of responses"))
    }
}

/// Model that never completes, for exercising timeout paths.
pub struct StallingModel;

#[async_trait]
impl ModelClient for StallingModel {
    async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String, WorkflowError> {
        std::future::pending().await
    }
}

/// Search backend that fabricates one hit per query with a URL derived from
/// the query text, so dedup and citation behavior is fully predictable.
pub struct DerivedSearch {
    engine: SearchEngine,
}

impl DerivedSearch {
    pub fn new(engine: SearchEngine) -> Self {
        Self { engine }
    }
}

pub fn derived_url(engine: SearchEngine, query: &str) -> String {
    format!(
        "https://{}.example.com/{}",
        engine.as_str(),
        query.replace(' ', "-")
    )
}

#[async_trait]
impl SearchClient for DerivedSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, WorkflowError> {
        Ok(vec![SearchHit {
            title: format!("Result for {query}"),
            url: derived_url(self.engine, query),
            content: format!("Snippet about {query}"),
            query: String::new(),
            provider: String::new(),
        }])
    }
}

/// Capabilities wiring scripted clients into the workflow.
pub struct MockCapabilities {
    pub model: Arc<dyn ModelClient>,
    pub tavily: Arc<dyn SearchClient>,
    pub serp: Arc<dyn SearchClient>,
}

impl MockCapabilities {
    pub fn scripted(responses: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Arc::new(Self {
            model: Arc::new(ScriptedModel::new(responses)),
            tavily: Arc::new(DerivedSearch::new(SearchEngine::Tavily)),
            serp: Arc::new(DerivedSearch::new(SearchEngine::SerpApi)),
        })
    }
}

impl Capabilities for MockCapabilities {
    fn model(
        &self,
        _provider: Provider,
        _model_override: Option<&str>,
    ) -> Result<Arc<dyn ModelClient>, WorkflowError> {
        Ok(self.model.clone())
    }

    fn search(&self, engine: SearchEngine) -> Result<Arc<dyn SearchClient>, WorkflowError> {
        Ok(match engine {
            SearchEngine::Tavily => self.tavily.clone(),
            SearchEngine::SerpApi => self.serp.clone(),
        })
    }
}

/// Settings with fake credentials for every provider.
pub fn full_settings() -> Settings {
    Settings {
        openai_api_key: Some("sk-test".to_string()),
        gemini_api_key: Some("gm-test".to_string()),
        tavily_api_key: Some("tv-test".to_string()),
        serp_api_key: Some("sp-test".to_string()),
        ..Settings::default()
    }
}

/// Settings with only OpenAI and Tavily, forcing single-search mode.
pub fn single_search_settings() -> Settings {
    Settings {
        openai_api_key: Some("sk-test".to_string()),
        tavily_api_key: Some("tv-test".to_string()),
        ..Settings::default()
    }
}
