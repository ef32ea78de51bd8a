//! Shared Application State
//!
//! The orchestrator owns every session; handlers only translate HTTP into
//! orchestrator calls.

use crate::config::Config;
use interview_core::InterviewOrchestrator;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InterviewOrchestrator>,
    pub config: Arc<Config>,
}
