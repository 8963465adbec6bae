//! Health check and status endpoints

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use super::ApiState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// System status response
#[derive(Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    pub persona: String,
    pub model: String,
    pub voice: String,
    pub sessions: usize,
}

/// Liveness probe - is the service running?
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Persona, model, voice and live session count
async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        persona: state.sessions.persona().name().to_string(),
        model: state.llm_model.clone(),
        voice: state.tts_voice.clone(),
        sessions: state.sessions.len().await,
    })
}

/// Build health router (liveness only, no state needed)
pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

/// Build status router
pub fn status_router(state: Arc<ApiState>) -> Router {
    Router::new().route("/api/status", get(status)).with_state(state)
}
