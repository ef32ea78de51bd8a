//! API Models
//!
//! Request and response bodies of the REST surface, documented for OpenAPI
//! with `utoipa`. Engine types are embedded as-is and appear as free-form
//! objects in the generated schema.

use chrono::{DateTime, Utc};
use interview_core::{
    AnswerEvaluation, CompletionDecisionResult, Difficulty, FinalReport, InterviewConfig,
    InterviewSession, InterviewType, Progress, Question, SessionOverview, StageRuntimeSettings,
    StartedInterview, TurnOutcome,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct StartInterviewPayload {
    #[schema(value_type = String, example = "technical")]
    pub interview_type: InterviewType,
    #[schema(example = "Backend Engineer")]
    pub target_role: String,
    #[schema(value_type = String, example = "medium")]
    pub difficulty: Difficulty,
    #[schema(example = 6)]
    pub total_questions: u32,
    /// Free-form background on the candidate or the position.
    pub context: Option<String>,
    /// Explicit stage settings; switches the session to coverage mode.
    #[schema(value_type = Option<Object>)]
    pub stage: Option<StageRuntimeSettings>,
    /// Whether to generate an introduction. Defaults to true.
    pub introduction: Option<bool>,
}

impl From<StartInterviewPayload> for InterviewConfig {
    fn from(payload: StartInterviewPayload) -> Self {
        let mut config = InterviewConfig::new(
            payload.interview_type,
            payload.target_role,
            payload.difficulty,
            payload.total_questions,
        );
        config.context = payload.context;
        config.stage = payload.stage;
        if let Some(introduction) = payload.introduction {
            config.introduction = introduction;
        }
        config
    }
}

/// A question as shown to the candidate.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct QuestionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub index: u32,
    pub text: String,
    #[schema(example = "main")]
    pub kind: String,
    pub asked_at: DateTime<Utc>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            index: question.index,
            text: question.text.clone(),
            kind: question.kind.to_string(),
            asked_at: question.asked_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct StartInterviewResponse {
    #[schema(value_type = Object)]
    pub session: InterviewSession,
    pub first_question: QuestionView,
    pub introduction: Option<String>,
}

impl From<StartedInterview> for StartInterviewResponse {
    fn from(started: StartedInterview) -> Self {
        Self {
            first_question: QuestionView::from(&started.first_question),
            session: started.session,
            introduction: started.introduction,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug, Clone)]
pub struct SubmitAnswerPayload {
    #[schema(value_type = String, format = Uuid)]
    pub question_id: Uuid,
    pub answer: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct SubmitAnswerResponse {
    #[schema(value_type = Object)]
    pub evaluation: AnswerEvaluation,
    /// Verdict with the pacing and coverage it was computed from.
    #[schema(value_type = Object)]
    pub decision: CompletionDecisionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing_notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closing_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub final_report: Option<FinalReport>,
}

impl From<TurnOutcome> for SubmitAnswerResponse {
    fn from(outcome: TurnOutcome) -> Self {
        Self {
            next_question: outcome.next_question.as_ref().map(QuestionView::from),
            evaluation: outcome.evaluation,
            decision: outcome.decision,
            transition: outcome.transition,
            reflection: outcome.reflection,
            pacing_notice: outcome.pacing_notice,
            closing_message: outcome.closing_message,
            final_report: outcome.final_report,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq)]
pub struct ProgressResponse {
    pub current: u32,
    pub total: u32,
    pub percent: u8,
}

impl From<Progress> for ProgressResponse {
    fn from(progress: Progress) -> Self {
        Self {
            current: progress.current,
            total: progress.total,
            percent: progress.percent,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct InterviewDetails {
    #[schema(value_type = Object)]
    pub session: InterviewSession,
    /// Every question asked so far, with answers and scores.
    #[schema(value_type = Vec<Object>)]
    pub questions: Vec<Question>,
    #[schema(value_type = Option<Object>)]
    pub feedback: Option<FinalReport>,
    pub progress: ProgressResponse,
}

impl From<SessionOverview> for InterviewDetails {
    fn from(overview: SessionOverview) -> Self {
        Self {
            session: overview.session,
            questions: overview.questions,
            feedback: overview.feedback,
            progress: overview.progress.into(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub sessions: usize,
    /// Sessions whose conversation memory is still held.
    pub active_memories: usize,
    #[schema(example = "openai")]
    pub provider: String,
    pub model: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub message: String,
    /// True when the same request may be resent unchanged.
    #[serde(default)]
    pub retryable: bool,
}
