//! Adaptive interview session engine.
//!
//! [`InterviewOrchestrator`] runs the turn loop; [`evaluate_completion`] is
//! the pure policy that decides after every answer whether to continue,
//! prioritize an uncovered criterion, or wrap up. Text generation and scoring
//! sit behind [`InterviewerService`].

pub mod capability;
pub mod completion;
pub mod coverage;
pub mod error;
pub mod interview;
pub mod interviewer;
pub mod llm_client;
pub mod memory;
pub mod orchestrator;
pub mod report;
pub mod session_store;
pub mod settings;
pub mod sources;
pub mod telemetry;

pub use capability::{AnswerEvaluation, InterviewerService, QuestionContext, StaticInterviewer};
pub use completion::{
    CompletionDecisionResult, CompletionSnapshot, CompletionVerdict, PacingSnapshot,
    PacingStatus, WrapUpReason, evaluate_completion,
};
pub use coverage::{CoverageTracker, Criterion, CriterionContribution};
pub use error::{InterviewError, Result};
pub use interview::{
    Difficulty, InterviewConfig, InterviewSession, InterviewType, Question, QuestionKind,
    SessionStatus,
};
pub use interviewer::LlmInterviewer;
pub use orchestrator::{
    InterviewOrchestrator, OrchestratorOptions, Progress, SessionOverview, StartedInterview,
    TurnOutcome,
};
pub use report::FinalReport;
pub use settings::StageRuntimeSettings;
