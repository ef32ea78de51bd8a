//! Axum Router Configuration
//!
//! REST routes for the interview engine plus the OpenAPI document and
//! Swagger UI.

use crate::{
    handlers,
    models::{
        ErrorResponse, HealthResponse, InterviewDetails, ProgressResponse, QuestionView,
        StartInterviewPayload, StartInterviewResponse, SubmitAnswerPayload, SubmitAnswerResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::start_interview,
        handlers::submit_answer,
        handlers::get_interview,
        handlers::get_progress,
        handlers::health,
    ),
    components(
        schemas(
            StartInterviewPayload,
            StartInterviewResponse,
            SubmitAnswerPayload,
            SubmitAnswerResponse,
            QuestionView,
            InterviewDetails,
            ProgressResponse,
            HealthResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "Interview API", description = "Adaptive interview sessions")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/interviews", post(handlers::start_interview))
        .route("/interviews/{id}", get(handlers::get_interview))
        .route("/interviews/{id}/answers", post(handlers::submit_answer))
        .route("/interviews/{id}/progress", get(handlers::get_progress))
        .route("/health", get(handlers::health))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
