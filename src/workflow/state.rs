//! Workflow state threaded through the three phases.

use serde::Serialize;

use crate::providers::{ChatMessage, Provider, SearchHit};
use crate::templates::TemplateName;

pub const SNIPPET_MAX_CHARS: usize = 300;

/// Phase state machine. Forward-only; each phase runs at most once per
/// request, and `Failed` is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Planned,
    Searched,
    Synthesized,
    Failed,
}

/// Per-request configuration. `provider` is rewritten in place by fallback
/// resolution so later phases and the response see the resolved provider.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub provider: Provider,
    pub model: Option<String>,
    pub template: TemplateName,
    pub search_budget: usize,
}

/// A citation-ready source derived 1:1 from a search hit. Ids are dense,
/// 1-based, and match the `[id]` markers the synthesis prompt asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Source {
    pub id: usize,
    pub title: String,
    pub url: String,
    pub snippet: String,
    pub query: String,
    pub provider: String,
}

impl Source {
    pub fn from_hits(hits: &[SearchHit]) -> Vec<Source> {
        hits.iter()
            .enumerate()
            .map(|(i, hit)| Source {
                id: i + 1,
                title: hit.title.clone(),
                url: hit.url.clone(),
                snippet: hit.content.chars().take(SNIPPET_MAX_CHARS).collect(),
                query: hit.query.clone(),
                provider: hit.provider.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub template: TemplateName,
    pub content: String,
    pub citations: Vec<Source>,
    pub dual_search: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_provider: Option<String>,
}

/// Mutable state owned by one workflow for one request. Never shared across
/// requests.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    pub query: String,
    pub config: ResearchConfig,
    pub conversation: Vec<ChatMessage>,
    pub plan: String,
    pub search_results: Vec<SearchHit>,
    pub sources: Vec<Source>,
    pub report: Option<Report>,
    pub tavily_report: Option<String>,
    pub serp_report: Option<String>,
    pub phase: Phase,
}

impl WorkflowState {
    pub fn new(query: String, config: ResearchConfig, conversation: Vec<ChatMessage>) -> Self {
        Self {
            query,
            config,
            conversation,
            plan: String::new(),
            search_results: Vec::new(),
            sources: Vec::new(),
            report: None,
            tavily_report: None,
            serp_report: None,
            phase: Phase::Created,
        }
    }
}
