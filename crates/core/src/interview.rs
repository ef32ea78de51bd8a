//! Interview records
//!
//! The session and question records owned by the orchestrator, plus the
//! configuration a caller supplies when starting an interview.

use crate::settings::StageRuntimeSettings;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The interview stage being simulated. Each maps to a runtime preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewType {
    HrScreen,
    Technical,
    Final,
}

impl fmt::Display for InterviewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewType::HrScreen => write!(f, "hr-screen"),
            InterviewType::Technical => write!(f, "technical"),
            InterviewType::Final => write!(f, "final"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Answers scoring below this step the difficulty down.
pub const STEP_DOWN_BELOW: u8 = 4;
/// Answers scoring above this step the difficulty up.
pub const STEP_UP_ABOVE: u8 = 8;

impl Difficulty {
    /// Shifts difficulty one level based on the last answer's score,
    /// clamped to the easy..hard range.
    pub fn adjusted_for(self, score: u8) -> Self {
        if score < STEP_DOWN_BELOW {
            match self {
                Difficulty::Hard => Difficulty::Medium,
                _ => Difficulty::Easy,
            }
        } else if score > STEP_UP_ABOVE {
            match self {
                Difficulty::Easy => Difficulty::Medium,
                _ => Difficulty::Hard,
            }
        } else {
            self
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Opening,
    Main,
    FollowUp,
    Closing,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::Opening => write!(f, "opening"),
            QuestionKind::Main => write!(f, "main"),
            QuestionKind::FollowUp => write!(f, "follow_up"),
            QuestionKind::Closing => write!(f, "closing"),
        }
    }
}

fn default_true() -> bool {
    true
}

/// What the caller asks for when starting an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewConfig {
    pub interview_type: InterviewType,
    pub target_role: String,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    /// Free-form background about the candidate or the role.
    #[serde(default)]
    pub context: Option<String>,
    /// Explicit runtime settings. When present the session runs in
    /// coverage mode and `total_questions` follows `max_questions`.
    #[serde(default)]
    pub stage: Option<StageRuntimeSettings>,
    /// Whether to open with a short interviewer introduction.
    #[serde(default = "default_true")]
    pub introduction: bool,
}

impl InterviewConfig {
    pub fn new(
        interview_type: InterviewType,
        target_role: impl Into<String>,
        difficulty: Difficulty,
        total_questions: u32,
    ) -> Self {
        Self {
            interview_type,
            target_role: target_role.into(),
            difficulty,
            total_questions,
            context: None,
            stage: None,
            introduction: true,
        }
    }

    pub fn with_stage(mut self, stage: StageRuntimeSettings) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn without_introduction(mut self) -> Self {
        self.introduction = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub candidate_id: String,
    pub interview_type: InterviewType,
    pub target_role: String,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    /// Number of accepted answers so far; also the index of the open question.
    pub current_question_index: u32,
    pub status: SessionStatus,
    /// Final 0-100 report score, set once on completion.
    pub overall_score: Option<u8>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl InterviewSession {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub session_id: Uuid,
    pub index: u32,
    pub text: String,
    pub kind: QuestionKind,
    pub asked_at: DateTime<Utc>,
    pub candidate_answer: Option<String>,
    pub score: Option<u8>,
    pub feedback: Option<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub project_mentioned: Option<String>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl Question {
    pub fn new(
        session_id: Uuid,
        index: u32,
        kind: QuestionKind,
        text: impl Into<String>,
        asked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            index,
            text: text.into(),
            kind,
            asked_at,
            candidate_answer: None,
            score: None,
            feedback: None,
            strengths: Vec::new(),
            improvements: Vec::new(),
            project_mentioned: None,
            answered_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.candidate_answer.is_none()
    }
}
