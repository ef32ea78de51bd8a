//! Axum Handlers for the REST API
//!
//! Each handler validates transport-level input, calls the orchestrator and
//! maps the engine's error taxonomy onto HTTP status codes. `utoipa` doc
//! attributes feed the OpenAPI document.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use interview_core::{InterviewConfig, InterviewError};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    models::{
        ErrorResponse, HealthResponse, InterviewDetails, ProgressResponse, StartInterviewPayload,
        StartInterviewResponse, SubmitAnswerPayload, SubmitAnswerResponse,
    },
    state::AppState,
};

pub const CANDIDATE_HEADER: &str = "x-candidate-id";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// The generation or scoring backend failed; the request may be resent.
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retryable) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message, false),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message, false),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message, false),
            ApiError::Upstream(message) => {
                error!("Upstream capability failure: {}", message);
                (StatusCode::BAD_GATEWAY, message, true)
            }
        };
        (status, Json(ErrorResponse { message, retryable })).into_response()
    }
}

impl From<InterviewError> for ApiError {
    fn from(err: InterviewError) -> Self {
        match err {
            InterviewError::NotFound(message) => Self::NotFound(message),
            InterviewError::Conflict(message) => Self::Conflict(message),
            InterviewError::Validation(message) => Self::BadRequest(message),
            err @ InterviewError::CapabilityFailure(_) => Self::Upstream(err.to_string()),
        }
    }
}

fn candidate_id(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(CANDIDATE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} header is required", CANDIDATE_HEADER)))
}

/// Start a new interview session.
#[utoipa::path(
    post,
    path = "/interviews",
    request_body = StartInterviewPayload,
    responses(
        (status = 201, description = "Interview started", body = StartInterviewResponse),
        (status = 400, description = "Invalid configuration", body = ErrorResponse),
        (status = 502, description = "Generation backend failed; retryable", body = ErrorResponse)
    ),
    params(
        ("x-candidate-id" = String, Header, description = "The ID of the candidate being interviewed")
    )
)]
pub async fn start_interview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartInterviewPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let candidate_id = candidate_id(&headers)?;
    let started = state
        .orchestrator
        .start_session(candidate_id, InterviewConfig::from(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(StartInterviewResponse::from(started))))
}

/// Submit the answer to the currently open question.
#[utoipa::path(
    post,
    path = "/interviews/{id}/answers",
    request_body = SubmitAnswerPayload,
    responses(
        (status = 200, description = "Answer evaluated", body = SubmitAnswerResponse),
        (status = 404, description = "Session or question not found", body = ErrorResponse),
        (status = 409, description = "Session completed, question not open, or turn in progress", body = ErrorResponse),
        (status = 502, description = "Generation backend failed; retryable", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerPayload>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    let outcome = state
        .orchestrator
        .submit_answer(id, payload.question_id, &payload.answer)
        .await
        .inspect_err(|e| warn!(session_id = %id, error = %e, "Answer rejected"))?;
    Ok(Json(SubmitAnswerResponse::from(outcome)))
}

/// Get a session with all of its questions and, once completed, its report.
#[utoipa::path(
    get,
    path = "/interviews/{id}",
    responses(
        (status = 200, description = "Session details", body = InterviewDetails),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_interview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewDetails>, ApiError> {
    let overview = state.orchestrator.get_status(id)?;
    Ok(Json(InterviewDetails::from(overview)))
}

/// Get how far a session has progressed.
#[utoipa::path(
    get,
    path = "/interviews/{id}/progress",
    responses(
        (status = 200, description = "Session progress", body = ProgressResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let progress = state.orchestrator.progress(id)?;
    Ok(Json(progress.into()))
}

/// Liveness check with the configured model backend.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.orchestrator.sessions();
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: sessions.session_count(),
        active_memories: sessions.memory_count(),
        provider: state.config.provider.as_str().to_string(),
        model: state.config.chat_model.clone(),
    })
}
