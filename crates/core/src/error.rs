//! Error taxonomy for the interview engine.

use uuid::Uuid;

/// Failures surfaced by the orchestrator's public operations.
///
/// `NotFound` and `Conflict` are raised before any state is touched.
/// `CapabilityFailure` is raised before a turn commits, so the same call
/// can be safely re-issued.
#[derive(Debug, thiserror::Error)]
pub enum InterviewError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Capability failure: {0:#}")]
    CapabilityFailure(#[source] anyhow::Error),
    #[error("Invalid interview configuration: {0}")]
    Validation(String),
}

impl InterviewError {
    pub(crate) fn session_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Session with id '{}' not found", id))
    }

    pub(crate) fn question_not_found(id: Uuid) -> Self {
        Self::NotFound(format!("Question with id '{}' not found", id))
    }

    /// Whether re-issuing the identical call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CapabilityFailure(_))
    }
}

pub type Result<T, E = InterviewError> = std::result::Result<T, E>;
