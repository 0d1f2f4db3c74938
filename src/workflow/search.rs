//! Search phase: run the planned queries and derive citation-ready sources.

use crate::error::WorkflowError;
use crate::providers::{SearchClient, SearchEngine, SearchHit};

use super::merge::{dedupe_results, interleave_results, MAX_MERGED_RESULTS};
use super::state::{Phase, Source};
use super::Workflow;

impl Workflow {
    pub(super) async fn search(&mut self) -> Result<(), WorkflowError> {
        tracing::info!("SEARCH - starting search phase");

        self.settings.validate_search_requirements()?;

        let provider = self.state.config.provider;
        let max_budget = if provider.is_quota_limited() {
            self.settings.gemini_max_searches
        } else {
            self.settings.max_searches
        };
        let budget = self.state.config.search_budget.min(max_budget);
        let queries = parse_plan_queries(&self.state.plan, budget);
        tracing::info!(budget, count = queries.len(), provider = %provider, "SEARCH - query budget");

        let tavily = self.caps.search(SearchEngine::Tavily)?;
        let hits = if self.settings.can_use_dual_search() {
            tracing::info!("SEARCH - running dual search");
            let serp = self.caps.search(SearchEngine::SerpApi)?;
            let (tavily_hits, serp_hits) = tokio::join!(
                execute_queries(tavily.as_ref(), &queries, SearchEngine::Tavily),
                execute_queries(serp.as_ref(), &queries, SearchEngine::SerpApi),
            );
            tracing::info!(
                tavily = tavily_hits.len(),
                serpapi = serp_hits.len(),
                "SEARCH - dual search returned"
            );
            dedupe_results(
                interleave_results(
                    tavily_hits,
                    serp_hits,
                    SearchEngine::Tavily,
                    SearchEngine::SerpApi,
                ),
                MAX_MERGED_RESULTS,
            )
        } else {
            tracing::info!("SEARCH - running single search");
            let hits = execute_queries(tavily.as_ref(), &queries, SearchEngine::Tavily).await;
            dedupe_results(hits, MAX_MERGED_RESULTS)
        };
        tracing::info!(unique = hits.len(), "SEARCH - complete");

        self.state.sources = Source::from_hits(&hits);
        self.state.search_results = hits;
        self.state.phase = Phase::Searched;
        Ok(())
    }
}

/// Lenient parsing of the model's numbered-list plan: split on newlines,
/// drop blank lines, strip list markers (digits, dots, dashes, quotes,
/// spaces) from both ends, truncate to the budget. The numbered-list
/// convention is assumed, never enforced.
pub(crate) fn parse_plan_queries(plan: &str, budget: usize) -> Vec<String> {
    plan.lines()
        .map(|line| {
            line.trim_matches(|c: char| {
                c.is_ascii_digit() || c == '.' || c == '-' || c == ' ' || c == '"'
            })
            .to_string()
        })
        .filter(|query| !query.is_empty())
        .take(budget)
        .collect()
}

/// Run queries in plan order against one engine. A failing query is logged
/// and skipped; the batch never fails as a whole.
pub(crate) async fn execute_queries(
    client: &dyn SearchClient,
    queries: &[String],
    engine: SearchEngine,
) -> Vec<SearchHit> {
    let mut all = Vec::new();
    for (idx, query) in queries.iter().enumerate() {
        tracing::info!(engine = %engine, query = %query, "query {}/{}", idx + 1, queries.len());
        match client.search(query).await {
            Ok(hits) => {
                tracing::info!(engine = %engine, count = hits.len(), "query {} returned", idx + 1);
                for mut hit in hits {
                    hit.query = query.clone();
                    hit.provider = engine.as_str().to_string();
                    all.push(hit);
                }
            }
            Err(e) => {
                tracing::error!(engine = %engine, error = %e, "query {} failed, continuing", idx + 1);
            }
        }
    }
    all
}
