//! Planning phase: decompose the research question into search queries.

use crate::providers::{invoke_guarded, ChatMessage, Provider};
use crate::templates::TemplateName;

use super::state::Phase;
use super::Workflow;
use crate::error::WorkflowError;

/// Target query-count range, chosen on two axes: the detailed template wants
/// wider coverage, and Gemini gets a narrower range to conserve quota.
fn query_count_range(template: TemplateName, provider: Provider) -> &'static str {
    let detailed = template == TemplateName::DetailedReport;
    match (detailed, provider.is_quota_limited()) {
        (true, false) => "8-12",
        (true, true) => "4-6",
        (false, false) => "3-6",
        (false, true) => "3-4",
    }
}

impl Workflow {
    pub(super) async fn plan(&mut self) -> Result<(), WorkflowError> {
        tracing::info!("PLAN - starting planning phase");

        let requested = self.state.config.provider;
        let provider = self.settings.resolve_provider(requested)?;
        if provider != requested {
            tracing::info!(requested = %requested, actual = %provider, "PLAN - provider updated");
        }
        self.state.config.provider = provider;

        let range = query_count_range(self.state.config.template, provider);
        let system = format!(
            "You are a research planner. Break the user query into {range} specific web searches. \
             Return numbered queries only. Be concise."
        );
        let messages = [
            ChatMessage::system(system),
            ChatMessage::user(self.state.query.clone()),
        ];

        let client = self
            .caps
            .model(provider, self.state.config.model.as_deref())?;
        let quota_limited = provider.is_quota_limited();
        match invoke_guarded(
            &client,
            &messages,
            quota_limited,
            self.settings.gemini_timeout_secs,
        )
        .await
        {
            Ok(text) => {
                tracing::info!(chars = text.len(), "PLAN - complete");
                self.state.plan = text;
            }
            Err(WorkflowError::ProviderTimeout { .. }) => {
                // Degrade instead of failing: Search always gets at least
                // one query to run.
                tracing::warn!("PLAN - timeout, using fallback plan");
                self.state.plan = fallback_plan(&self.state.query);
            }
            Err(e) => return Err(e),
        }

        self.state.phase = Phase::Planned;
        Ok(())
    }
}

fn fallback_plan(query: &str) -> String {
    format!("1. {query}\n2. {query} overview\n3. {query} details")
}
