//! Synthesis phase: turn gathered sources into a cited report.
//!
//! Single mode generates one report from all sources. Dual mode generates
//! one report per search engine in parallel, then asks the model to judge
//! which is better; the losing side's sources are dropped from citations.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use crate::error::WorkflowError;
use crate::providers::{invoke_guarded, ChatMessage, ModelClient, SearchEngine};
use crate::templates::{provider_instructions, TemplateName, CITATION_INSTRUCTION};

use super::state::{Phase, Report, Source};
use super::Workflow;

/// Source cap for Gemini synthesis prompts, applied before prompt build.
const GEMINI_MAX_SOURCES: usize = 10;

const TIMEOUT_REPORT_MESSAGE: &str =
    "Report generation timed out. Please try with fewer search queries or use OpenAI.";
const SIDE_TIMED_OUT: &str = "Report timed out";

impl Workflow {
    pub(super) async fn synthesize(&mut self) -> Result<(), WorkflowError> {
        tracing::info!("SYNTHESIZE - starting synthesis phase");

        // Re-resolve: an earlier phase may have rewritten the provider, and
        // resolution is idempotent either way.
        let provider = self.settings.resolve_provider(self.state.config.provider)?;
        self.state.config.provider = provider;
        let quota_limited = provider.is_quota_limited();
        let client = self
            .caps
            .model(provider, self.state.config.model.as_deref())?;

        let has_tavily = self.has_sources_from(SearchEngine::Tavily);
        let has_serp = self.has_sources_from(SearchEngine::SerpApi);
        let dual = self.settings.can_use_dual_search() && has_tavily && has_serp;

        if dual {
            self.synthesize_dual(&client, quota_limited).await?;
        } else {
            self.synthesize_single(&client, quota_limited).await?;
        }

        tracing::info!("SYNTHESIZE - complete");
        self.state.phase = Phase::Synthesized;
        Ok(())
    }

    fn has_sources_from(&self, engine: SearchEngine) -> bool {
        self.state
            .sources
            .iter()
            .any(|s| s.provider == engine.as_str())
    }

    async fn synthesize_single(
        &mut self,
        client: &Arc<dyn ModelClient>,
        quota_limited: bool,
    ) -> Result<(), WorkflowError> {
        tracing::info!("SYNTHESIZE - generating single report");
        let template = self.state.config.template;

        let mut cited = self.state.sources.clone();
        if quota_limited && cited.len() > GEMINI_MAX_SOURCES {
            tracing::info!(
                from = cited.len(),
                to = GEMINI_MAX_SOURCES,
                "SYNTHESIZE - limiting sources for gemini"
            );
            cited.truncate(GEMINI_MAX_SOURCES);
        }

        let sources_text = cited
            .iter()
            .map(|s| format!("[{}] {} - {}", s.id, s.title, s.url))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = synthesis_messages(&self.state.query, &sources_text, template, quota_limited);

        match invoke_guarded(
            client,
            &messages,
            quota_limited,
            self.settings.gemini_timeout_secs,
        )
        .await
        {
            Ok(mut content) => {
                if template == TemplateName::TwoColumn && quota_limited {
                    content = extract_table_block(&content);
                }
                tracing::info!(chars = content.len(), "SYNTHESIZE - report generated");
                self.state.report = Some(Report {
                    template,
                    content,
                    citations: cited,
                    dual_search: false,
                    winning_provider: None,
                });
            }
            Err(WorkflowError::ProviderTimeout { .. }) => {
                // Timeout degrades to a canned message; the citations the
                // prompt would have used are still reported.
                self.state.report = Some(Report {
                    template,
                    content: TIMEOUT_REPORT_MESSAGE.to_string(),
                    citations: cited,
                    dual_search: false,
                    winning_provider: None,
                });
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn synthesize_dual(
        &mut self,
        client: &Arc<dyn ModelClient>,
        quota_limited: bool,
    ) -> Result<(), WorkflowError> {
        tracing::info!("SYNTHESIZE - generating reports from both search engines");
        let template = self.state.config.template;

        let (tavily_report, serp_report) = {
            let this = &*self;
            let tavily_fut =
                this.side_report(client, SearchEngine::Tavily, template, quota_limited);
            let serp_fut = this.side_report(client, SearchEngine::SerpApi, template, quota_limited);
            if quota_limited {
                // Only the quota-limited provider gets an outer deadline per
                // side; an expired side becomes a placeholder, not a failure.
                let deadline = Duration::from_secs(self.settings.gemini_request_timeout_secs);
                let (tavily, serp) =
                    tokio::join!(timeout(deadline, tavily_fut), timeout(deadline, serp_fut));
                let tavily = match tavily {
                    Ok(result) => result?,
                    Err(_) => SIDE_TIMED_OUT.to_string(),
                };
                let serp = match serp {
                    Ok(result) => result?,
                    Err(_) => SIDE_TIMED_OUT.to_string(),
                };
                (tavily, serp)
            } else {
                let (tavily, serp) = tokio::join!(tavily_fut, serp_fut);
                (tavily?, serp?)
            }
        };
        tracing::info!(
            tavily_chars = tavily_report.len(),
            serpapi_chars = serp_report.len(),
            "SYNTHESIZE - both reports generated"
        );

        let winner = self
            .judge_winner(client, &tavily_report, &serp_report, quota_limited)
            .await?;
        tracing::info!(winner = %winner, "SYNTHESIZE - judge selected winner");

        let content = match winner {
            SearchEngine::Tavily => tavily_report.clone(),
            SearchEngine::SerpApi => serp_report.clone(),
        };
        let citations: Vec<Source> = self
            .state
            .sources
            .iter()
            .filter(|s| s.provider == winner.as_str())
            .cloned()
            .collect();

        self.state.tavily_report = Some(tavily_report);
        self.state.serp_report = Some(serp_report);
        self.state.report = Some(Report {
            template,
            content,
            citations,
            dual_search: true,
            winning_provider: Some(winner.as_str().to_string()),
        });
        Ok(())
    }

    /// Generate one report from a single engine's sources. Inner invocation
    /// timeouts become the canned degradation message; other errors
    /// propagate.
    async fn side_report(
        &self,
        client: &Arc<dyn ModelClient>,
        engine: SearchEngine,
        template: TemplateName,
        quota_limited: bool,
    ) -> Result<String, WorkflowError> {
        let mut subset: Vec<&Source> = self
            .state
            .sources
            .iter()
            .filter(|s| s.provider == engine.as_str())
            .collect();
        if quota_limited && subset.len() > GEMINI_MAX_SOURCES {
            subset.truncate(GEMINI_MAX_SOURCES);
        }

        let sources_text = subset
            .iter()
            .map(|s| format!("[{}] {} - {} (from {})", s.id, s.title, s.url, s.provider))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = synthesis_messages(&self.state.query, &sources_text, template, quota_limited);

        match invoke_guarded(
            client,
            &messages,
            quota_limited,
            self.settings.gemini_timeout_secs,
        )
        .await
        {
            Ok(mut content) => {
                if template == TemplateName::TwoColumn && quota_limited {
                    content = extract_table_block(&content);
                }
                Ok(content)
            }
            Err(WorkflowError::ProviderTimeout { .. }) => {
                tracing::error!(engine = %engine, "SYNTHESIZE - side report timed out");
                Ok(TIMEOUT_REPORT_MESSAGE.to_string())
            }
            Err(e) => Err(e),
        }
    }

    /// Ask the model to pick the better report. Matching is a
    /// case-insensitive substring test on the trimmed response; anything
    /// that does not name SerpAPI, including a judge timeout, resolves to
    /// Tavily.
    async fn judge_winner(
        &self,
        client: &Arc<dyn ModelClient>,
        tavily_report: &str,
        serp_report: &str,
        quota_limited: bool,
    ) -> Result<SearchEngine, WorkflowError> {
        let prompt = judge_prompt(&self.state.query, tavily_report, serp_report);
        let choice = match invoke_guarded(
            client,
            &[ChatMessage::user(prompt)],
            quota_limited,
            self.settings.gemini_timeout_secs,
        )
        .await
        {
            Ok(text) => text.trim().to_uppercase(),
            Err(WorkflowError::ProviderTimeout { .. }) => {
                tracing::warn!("SYNTHESIZE - judge timed out, defaulting to tavily");
                "TAVILY".to_string()
            }
            Err(e) => return Err(e),
        };

        if choice.contains("SERPAPI") {
            Ok(SearchEngine::SerpApi)
        } else {
            Ok(SearchEngine::Tavily)
        }
    }
}

fn synthesis_messages(
    query: &str,
    sources_text: &str,
    template: TemplateName,
    quota_limited: bool,
) -> [ChatMessage; 2] {
    let system = format!(
        "{}\n{}",
        provider_instructions(template, quota_limited),
        CITATION_INSTRUCTION
    );
    let user = format!("QUERY:\n{query}\n\nSOURCES:\n{sources_text}");
    [ChatMessage::system(system), ChatMessage::user(user)]
}

fn judge_prompt(query: &str, tavily_report: &str, serp_report: &str) -> String {
    format!(
        "You are a research quality evaluator. You have two research reports on the same topic \
from different search sources.\n\n\
QUERY: {query}\n\n\
TAVILY REPORT:\n{tavily_report}\n\n\
---\n\n\
SERPAPI REPORT:\n{serp_report}\n\n\
---\n\n\
Your task: Analyze both reports and select the BETTER one. Consider:\n\
- Comprehensiveness and depth of information\n\
- Source quality and credibility\n\
- Factual accuracy and specificity\n\
- Direct relevance to the query\n\
- Clarity and structure\n\n\
Respond with ONLY ONE of these exact phrases, nothing else:\n\
- \"TAVILY\" if the Tavily report is better\n\
- \"SERPAPI\" if the SerpAPI report is better\n\n\
Your choice:"
    )
}

/// Extract the contiguous block of pipe-bearing lines from a response.
/// Gemini tends to wrap tables in prose despite strict-output instructions;
/// when no table is present the response passes through unchanged.
pub(crate) fn extract_table_block(content: &str) -> String {
    let mut table_lines = Vec::new();
    let mut in_table = false;
    for line in content.lines() {
        let stripped = line.trim();
        if stripped.contains('|') {
            in_table = true;
            table_lines.push(line);
        } else if in_table && stripped.is_empty() {
            continue;
        } else if in_table {
            break;
        }
    }
    if table_lines.is_empty() {
        tracing::warn!("no table found in response, returning original content");
        return content.to_string();
    }
    table_lines.join("\n")
}
