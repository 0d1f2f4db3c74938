//! Model provider clients (OpenAI, Gemini) behind the `ModelClient` trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::Provider;
use crate::config::Settings;
use crate::error::{ConfigError, WorkflowError};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_TEMPERATURE: f64 = 0.2;
const HTTP_CLIENT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Opaque model capability: ordered messages in, text out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, WorkflowError>;
}

/// Invoke a model with timeout protection for the quota-limited provider.
///
/// OpenAI calls run without a timeout wrapper. Gemini calls race against a
/// wall-clock deadline; on expiry the caller receives `ProviderTimeout` and
/// substitutes a fallback value. Other invocation errors pass through.
pub async fn invoke_guarded(
    client: &Arc<dyn ModelClient>,
    messages: &[ChatMessage],
    quota_limited: bool,
    timeout_secs: u64,
) -> Result<String, WorkflowError> {
    if !quota_limited {
        return client.invoke(messages).await;
    }
    match tokio::time::timeout(Duration::from_secs(timeout_secs), client.invoke(messages)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_secs, "model invocation exceeded timeout");
            Err(WorkflowError::ProviderTimeout { secs: timeout_secs })
        }
    }
}

/// Build a client for the already-resolved provider.
pub fn model_client(
    settings: &Settings,
    provider: Provider,
    model_override: Option<&str>,
) -> Result<Arc<dyn ModelClient>, WorkflowError> {
    let http = http_client()?;
    match provider {
        Provider::OpenAi => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingCredential("OPENAI_API_KEY".to_string()))?;
            let model = model_override.unwrap_or(&settings.model).to_string();
            Ok(Arc::new(OpenAiClient {
                http,
                api_key,
                model,
            }))
        }
        Provider::Gemini => {
            let api_key = settings
                .gemini_api_key
                .clone()
                .ok_or_else(|| ConfigError::MissingCredential("GEMINI_API_KEY".to_string()))?;
            let model = model_override.unwrap_or(DEFAULT_GEMINI_MODEL).to_string();
            Ok(Arc::new(GeminiClient {
                http,
                api_key,
                model,
                max_output_tokens: settings.gemini_max_output_tokens,
                max_retries: settings.gemini_max_retries,
            }))
        }
    }
}

fn http_client() -> Result<reqwest::Client, WorkflowError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
        .build()
        .map_err(|e| WorkflowError::Provider {
            provider: "http_client".to_string(),
            message: e.to_string(),
        })
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, WorkflowError> {
        let body = json!({
            "model": self.model,
            "temperature": DEFAULT_TEMPERATURE,
            "messages": messages,
        });

        let response = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::Provider {
                provider: "openai".to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Provider {
                provider: "openai".to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        let payload: Value = response.json().await.map_err(|e| WorkflowError::Provider {
            provider: "openai".to_string(),
            message: e.to_string(),
        })?;
        payload
            .get("choices")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| WorkflowError::Provider {
                provider: "openai".to_string(),
                message: "missing message content".to_string(),
            })
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_output_tokens: u32,
    max_retries: u32,
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, WorkflowError> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.generate(messages).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "gemini request failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| WorkflowError::Provider {
            provider: "gemini".to_string(),
            message: "request failed".to_string(),
        }))
    }
}

impl GeminiClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, WorkflowError> {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();
        for message in messages {
            match message.role.as_str() {
                "system" => system_parts.push(json!({ "text": message.content })),
                "assistant" => {
                    contents.push(json!({ "role": "model", "parts": [{ "text": message.content }] }))
                }
                _ => contents.push(json!({ "role": "user", "parts": [{ "text": message.content }] })),
            }
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": DEFAULT_TEMPERATURE,
                "maxOutputTokens": self.max_output_tokens,
            },
        });
        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| WorkflowError::Provider {
                provider: "gemini".to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Provider {
                provider: "gemini".to_string(),
                message: format!("status {}: {}", status, body),
            });
        }

        let payload: Value = response.json().await.map_err(|e| WorkflowError::Provider {
            provider: "gemini".to_string(),
            message: e.to_string(),
        })?;
        payload
            .get("candidates")
            .and_then(|v| v.as_array())
            .and_then(|arr| arr.first())
            .and_then(|candidate| candidate.get("content"))
            .and_then(|content| content.get("parts"))
            .and_then(|v| v.as_array())
            .and_then(|parts| parts.first())
            .and_then(|part| part.get("text"))
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| WorkflowError::Provider {
                provider: "gemini".to_string(),
                message: "missing candidate text".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StallingModel;

    #[async_trait]
    impl ModelClient for StallingModel {
        async fn invoke(&self, _messages: &[ChatMessage]) -> Result<String, WorkflowError> {
            std::future::pending().await
        }
    }

    struct EchoModel;

    #[async_trait]
    impl ModelClient for EchoModel {
        async fn invoke(&self, messages: &[ChatMessage]) -> Result<String, WorkflowError> {
            Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn guarded_invoke_times_out_only_when_quota_limited() {
        let client: Arc<dyn ModelClient> = Arc::new(StallingModel);
        let messages = [ChatMessage::user("hi")];

        let result = invoke_guarded(&client, &messages, true, 1).await;
        assert_eq!(result, Err(WorkflowError::ProviderTimeout { secs: 1 }));
    }

    #[tokio::test]
    async fn guarded_invoke_passes_result_through() {
        let client: Arc<dyn ModelClient> = Arc::new(EchoModel);
        let messages = [ChatMessage::user("hello")];

        assert_eq!(
            invoke_guarded(&client, &messages, false, 1).await,
            Ok("hello".to_string())
        );
        assert_eq!(
            invoke_guarded(&client, &messages, true, 5).await,
            Ok("hello".to_string())
        );
    }
}
