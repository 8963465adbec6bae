//! Conversation session endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::controller::{TurnController, TurnOutcome};
use crate::presentation::TranscriptView;
use crate::session::SharedController;

/// Build session router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/text", post(submit_text))
        .route("/{id}/audio", post(submit_audio))
        .route("/{id}/input", post(submit_input))
        .with_state(state)
}

/// New session response
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub view: TranscriptView,
}

/// Result of one interaction
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// `idle`, `replied` or `error`
    pub outcome: &'static str,
    pub view: TranscriptView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Typed submission
#[derive(Debug, Deserialize)]
pub struct TextInput {
    pub text: String,
}

/// One cycle in which audio and text may both be pending
#[derive(Debug, Default, Deserialize)]
pub struct CycleInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio_base64: Option<String>,
}

async fn create_session(State(state): State<Arc<ApiState>>) -> Json<CreateSessionResponse> {
    let (session_id, controller) = state.sessions.create().await;
    let view = {
        let controller = controller.lock().await;
        view_of(&controller, None)
    };

    Json(CreateSessionResponse { session_id, view })
}

async fn get_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TranscriptView>, ApiError> {
    let shared = lookup(&state, id).await?;
    let controller = shared.lock().await;
    Ok(Json(view_of(&controller, None)))
}

async fn delete_session(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

async fn submit_text(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<TextInput>,
) -> Result<Response, ApiError> {
    let shared = lookup(&state, id).await?;
    let mut controller = shared.lock().await;
    let result = controller.on_text_submitted(&input.text).await;
    respond(&controller, result)
}

/// Accepts a 16-bit PCM WAV body
async fn submit_audio(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Response, ApiError> {
    check_audio_size(&state, body.len())?;
    let shared = lookup(&state, id).await?;
    let mut controller = shared.lock().await;
    let result = controller.on_audio_captured(&body).await;
    respond(&controller, result)
}

async fn submit_input(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Json(input): Json<CycleInput>,
) -> Result<Response, ApiError> {
    let audio = input
        .audio_base64
        .as_deref()
        .map(|encoded| STANDARD.decode(encoded.trim()))
        .transpose()
        .map_err(|e| ApiError::BadRequest(format!("audio_base64 is not valid base64: {e}")))?;

    if let Some(audio) = &audio {
        check_audio_size(&state, audio.len())?;
    }

    let shared = lookup(&state, id).await?;
    let mut controller = shared.lock().await;
    let result = controller
        .process(audio.as_deref(), input.text.as_deref())
        .await;
    respond(&controller, result)
}

async fn lookup(state: &ApiState, id: Uuid) -> Result<SharedController, ApiError> {
    state
        .sessions
        .get(&id)
        .await
        .ok_or(ApiError::SessionNotFound(id))
}

const fn check_audio_size(state: &ApiState, size: usize) -> Result<(), ApiError> {
    if size > state.max_audio_bytes {
        return Err(ApiError::PayloadTooLarge {
            size,
            limit: state.max_audio_bytes,
        });
    }
    Ok(())
}

fn view_of(controller: &TurnController, audio: Option<&crate::gateway::AudioArtifact>) -> TranscriptView {
    TranscriptView::render(controller.history(), controller.persona().name(), audio)
}

/// Map a turn result to a response
///
/// Gateway failures (502) and unusable captures (422) still carry the
/// current view so the user turn stays visible next to the error.
fn respond(controller: &TurnController, result: crate::Result<TurnOutcome>) -> Result<Response, ApiError> {
    match result {
        Ok(TurnOutcome::Idle) => Ok(Json(TurnResponse {
            outcome: "idle",
            view: view_of(controller, None),
            error: None,
        })
        .into_response()),
        Ok(TurnOutcome::Replied { audio, .. }) => Ok(Json(TurnResponse {
            outcome: "replied",
            view: view_of(controller, Some(&audio)),
            error: None,
        })
        .into_response()),
        Err(e) if e.is_gateway() || e.is_bad_input() => {
            tracing::warn!(session_id = %controller.id(), error = %e, "turn failed");
            let status = if e.is_bad_input() {
                StatusCode::UNPROCESSABLE_ENTITY
            } else {
                StatusCode::BAD_GATEWAY
            };
            Ok((
                status,
                Json(TurnResponse {
                    outcome: "error",
                    view: view_of(controller, None),
                    error: Some(e.to_string()),
                }),
            )
                .into_response())
        }
        Err(e) => {
            tracing::error!(session_id = %controller.id(), error = %e, "turn failed");
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

/// Session API errors
#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(Uuid),
    PayloadTooLarge { size: usize, limit: usize },
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::SessionNotFound(id) => (StatusCode::NOT_FOUND, "session_not_found", format!("no session {id}")),
            Self::PayloadTooLarge { size, limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "audio_too_large",
                format!("audio is {size} bytes, limit is {limit}"),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
