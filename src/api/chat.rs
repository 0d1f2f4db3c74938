//! Lightweight chat endpoint sharing the process-wide conversation buffer.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::providers::{invoke_guarded, ChatMessage, Provider};

use super::ApiState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default = "default_provider")]
    pub provider: Provider,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_provider() -> Provider {
    Provider::OpenAi
}

/// Single model turn over the shared history, no search or synthesis.
pub async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let result = chat_inner(&state, req).await;
    match result {
        Ok(body) => (StatusCode::OK, Json(body)),
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

async fn chat_inner(
    state: &ApiState,
    req: ChatRequest,
) -> Result<serde_json::Value, crate::error::WorkflowError> {
    let provider = state.settings.resolve_provider(req.provider)?;
    let client = state.capabilities.model(provider, req.model.as_deref())?;

    let user_message = ChatMessage::user(req.query);
    let messages = {
        let mut memory = state.memory.lock().await;
        memory.push(user_message);
        memory.snapshot()
    };

    let response = invoke_guarded(
        &client,
        &messages,
        provider.is_quota_limited(),
        state.settings.gemini_timeout_secs,
    )
    .await?;

    {
        let mut memory = state.memory.lock().await;
        memory.push(ChatMessage::assistant(response.clone()));
    }

    Ok(json!({
        "response": response,
        "mode": "chat",
        "actual_provider": provider,
    }))
}
