//! Research endpoints: streaming `/run` and blocking `/run_sync`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::providers::{ChatMessage, Provider};
use crate::templates::TemplateName;
use crate::workflow::{ResearchConfig, Workflow, WorkflowState};

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub query: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_template")]
    pub template: TemplateName,
    #[serde(default = "default_search_budget")]
    pub search_budget: usize,
}

fn default_provider() -> Provider {
    Provider::OpenAi
}

fn default_template() -> TemplateName {
    TemplateName::BulletSummary
}

fn default_search_budget() -> usize {
    6
}

async fn build_workflow(state: &ApiState, req: RunRequest) -> Workflow {
    // Fold request history into the shared buffer, then run against a
    // snapshot so concurrent requests cannot mutate mid-flight.
    let conversation = {
        let mut memory = state.memory.lock().await;
        memory.extend(req.messages);
        memory.snapshot()
    };
    let config = ResearchConfig {
        provider: req.provider,
        model: req.model,
        template: req.template,
        search_budget: req.search_budget,
    };
    let workflow_state = WorkflowState::new(req.query, config, conversation);
    Workflow::new(
        state.settings.clone(),
        state.capabilities.clone(),
        workflow_state,
    )
}

/// Append the completed research turn to the shared conversation buffer so
/// later chat and run requests see it.
async fn record_turn(state: &ApiState, final_state: &WorkflowState) {
    if let Some(report) = &final_state.report {
        let mut memory = state.memory.lock().await;
        memory.push(ChatMessage::user(final_state.query.clone()));
        memory.push(ChatMessage::assistant(report.content.clone()));
    }
}

/// Run the workflow to completion and return the final state as one JSON
/// document.
pub async fn run_sync(
    State(state): State<ApiState>,
    Json(req): Json<RunRequest>,
) -> impl IntoResponse {
    let workflow = build_workflow(&state, req).await;
    match workflow.run().await {
        Ok(final_state) => {
            record_turn(&state, &final_state).await;
            (
                StatusCode::OK,
                Json(json!({
                    "report": final_state.report,
                    "plan": final_state.plan,
                    "sources": final_state.sources,
                    "actual_provider": final_state.config.provider,
                })),
            )
        }
        Err(e) => {
            let status = if e.is_credential() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(json!({ "error": e.to_string() })))
        }
    }
}

/// Run the workflow with progress streamed as server-sent events. The
/// stream always ends with a `done` or `error` event.
pub async fn run(
    State(state): State<ApiState>,
    Json(req): Json<RunRequest>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel();
    let workflow = build_workflow(&state, req).await.with_progress(tx);

    tokio::spawn(async move {
        // Errors already surfaced on the channel as a terminal event.
        if let Ok(final_state) = workflow.run().await {
            record_turn(&state, &final_state).await;
        }
    });

    let stream = UnboundedReceiverStream::new(rx)
        .map(|event| Ok(Event::default().event(event.name()).data(event.payload().to_string())));

    Sse::new(stream).keep_alive(KeepAlive::default())
}
