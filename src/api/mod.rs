//! HTTP API routes for the research service.

use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub mod chat;
pub mod research;

use crate::config::Settings;
use crate::memory::SharedMemory;
use crate::workflow::Capabilities;

#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<Settings>,
    pub memory: SharedMemory,
    pub capabilities: Arc<dyn Capabilities>,
}

/// Configure all API routes.
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/run", post(research::run))
        .route("/run_sync", post(research::run_sync))
        .route("/chat", post(chat::chat))
}

/// Permissive CORS for browser clients; the service carries no cookies or
/// ambient credentials.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Health check endpoint, reporting which optional features the current
/// credentials enable.
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "researchd",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "features": {
                "openai": state.settings.openai_api_key.is_some(),
                "gemini": state.settings.has_gemini(),
                "tavily": state.settings.has_tavily(),
                "serpapi": state.settings.has_serp(),
                "dual_search": state.settings.can_use_dual_search(),
            }
        })),
    )
}
