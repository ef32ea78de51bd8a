//! Interviewer Capability
//!
//! The narrow contract through which the engine obtains natural-language
//! content: questions, answer evaluations, coverage attribution, closings,
//! reflections and the final assessment. The engine never inspects how the
//! text is produced; it only relies on the shapes defined here.

use crate::coverage::{Criterion, CriterionContribution};
use crate::interview::{Difficulty, InterviewConfig, InterviewType, QuestionKind};
use crate::memory::Exchange;
use crate::report::{ReportAssessment, SubScores, TranscriptEntry, mean_score};
use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Structured evaluation of one answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnswerEvaluation {
    /// Answer quality from 1 (poor) to 10 (excellent).
    pub score: u8,
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    /// A named project or example the candidate relied on, if any.
    #[serde(default)]
    pub project_mentioned: Option<String>,
    /// Evaluator confidence in the score, from 0.0 to 1.0.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Everything the question generator sees for the next turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionContext {
    pub interview_type: InterviewType,
    pub target_role: String,
    pub difficulty: Difficulty,
    pub kind: QuestionKind,
    pub index: u32,
    pub total_questions: u32,
    pub history: Vec<Exchange>,
    pub active_project: Option<String>,
    /// Set when the completion engine asked to steer toward a gap.
    pub focus: Option<Criterion>,
    pub candidate_context: Option<String>,
}

/// Defines the contract for any service that can drive an interview's content.
///
/// Implementations may be backed by a language model, a static script, or
/// anything else. Errors are surfaced verbatim to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InterviewerService: Send + Sync {
    /// A short greeting that frames the interview.
    async fn generate_introduction(&self, config: &InterviewConfig) -> Result<String>;

    async fn generate_question(&self, context: &QuestionContext) -> Result<String>;

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        config: &InterviewConfig,
    ) -> Result<AnswerEvaluation>;

    /// Attributes an answer to one or more coverage criteria.
    async fn classify_coverage(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<Vec<CriterionContribution>>;

    async fn generate_closing(&self, config: &InterviewConfig) -> Result<String>;

    /// A brief acknowledgment of the candidate's answer, or `None` when
    /// nothing useful can be said.
    async fn generate_reflection(
        &self,
        answer: &str,
        previous_reflection: Option<String>,
    ) -> Result<Option<String>>;

    async fn generate_final_report(
        &self,
        transcript: &[TranscriptEntry],
        scores: &[u8],
    ) -> Result<ReportAssessment>;
}

/// A deterministic `InterviewerService` for demos and tests.
///
/// Queued evaluations and coverage attributions are consumed in order; once
/// exhausted it falls back to fixed heuristics, so the same answers always
/// produce the same session.
pub struct StaticInterviewer {
    evaluations: Mutex<VecDeque<AnswerEvaluation>>,
    coverage: Mutex<VecDeque<Vec<CriterionContribution>>>,
    default_score: u8,
    rotation: Mutex<usize>,
}

impl Default for StaticInterviewer {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticInterviewer {
    pub fn new() -> Self {
        Self {
            evaluations: Mutex::new(VecDeque::new()),
            coverage: Mutex::new(VecDeque::new()),
            default_score: 6,
            rotation: Mutex::new(0),
        }
    }

    pub fn with_default_score(mut self, score: u8) -> Self {
        self.default_score = score.clamp(1, 10);
        self
    }

    /// Queues evaluations returned by successive `evaluate_answer` calls.
    pub fn with_evaluations(self, evaluations: impl IntoIterator<Item = AnswerEvaluation>) -> Self {
        self.evaluations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(evaluations);
        self
    }

    /// Queues evaluations built from bare scores.
    pub fn with_scores(self, scores: impl IntoIterator<Item = u8>) -> Self {
        let evaluations: Vec<_> = scores.into_iter().map(scored).collect();
        self.with_evaluations(evaluations)
    }

    /// Queues coverage attributions returned by successive `classify_coverage` calls.
    pub fn with_coverage(
        self,
        coverage: impl IntoIterator<Item = Vec<CriterionContribution>>,
    ) -> Self {
        self.coverage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(coverage);
        self
    }
}

fn scored(score: u8) -> AnswerEvaluation {
    AnswerEvaluation {
        score,
        feedback: format!("Scored {} out of 10.", score),
        strengths: Vec::new(),
        improvements: Vec::new(),
        project_mentioned: None,
        confidence: None,
    }
}

#[async_trait]
impl InterviewerService for StaticInterviewer {
    async fn generate_introduction(&self, config: &InterviewConfig) -> Result<String> {
        Ok(format!(
            "Hi, thanks for joining this {} interview for the {} role. I'll ask a few questions and we'll go from there.",
            config.interview_type, config.target_role
        ))
    }

    async fn generate_question(&self, context: &QuestionContext) -> Result<String> {
        let text = match (context.kind, context.focus, context.active_project.as_deref()) {
            (QuestionKind::Opening, _, _) => format!(
                "To start, could you walk me through your background and what draws you to the {} role?",
                context.target_role
            ),
            (QuestionKind::Closing, _, _) => {
                "Before we finish, is there anything you'd like to ask us or add?".to_string()
            }
            (_, Some(focus), _) => format!(
                "Let's talk about {}. Can you give me a concrete example?",
                focus.label()
            ),
            (QuestionKind::FollowUp, None, Some(project)) => format!(
                "You mentioned {}. What was the hardest {} decision you made there?",
                project, context.difficulty
            ),
            _ => format!(
                "Question {} of {}: describe a {} problem you solved recently and how you approached it.",
                context.index + 1,
                context.total_questions,
                context.difficulty
            ),
        };
        Ok(text)
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        answer: &str,
        _config: &InterviewConfig,
    ) -> Result<AnswerEvaluation> {
        let queued = self
            .evaluations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(evaluation) = queued {
            return Ok(evaluation);
        }
        let mut evaluation = scored(self.default_score);
        if answer.split_whitespace().count() < 5 {
            evaluation.improvements.push("Add more detail.".to_string());
        }
        Ok(evaluation)
    }

    async fn classify_coverage(
        &self,
        _question: &str,
        _answer: &str,
    ) -> Result<Vec<CriterionContribution>> {
        let queued = self
            .coverage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(contributions) = queued {
            return Ok(contributions);
        }
        let mut rotation = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let criterion = Criterion::ALL[*rotation % Criterion::ALL.len()];
        *rotation += 1;
        Ok(vec![CriterionContribution {
            criterion,
            score: 0.5,
            note: None,
        }])
    }

    async fn generate_closing(&self, config: &InterviewConfig) -> Result<String> {
        Ok(format!(
            "Thank you for your time today. That concludes the {} interview.",
            config.interview_type
        ))
    }

    async fn generate_reflection(
        &self,
        _answer: &str,
        previous_reflection: Option<String>,
    ) -> Result<Option<String>> {
        let reflection = "Thanks, that gives me a clear picture.";
        if previous_reflection.as_deref() == Some(reflection) {
            return Ok(Some("Got it, that's helpful context.".to_string()));
        }
        Ok(Some(reflection.to_string()))
    }

    async fn generate_final_report(
        &self,
        transcript: &[TranscriptEntry],
        scores: &[u8],
    ) -> Result<ReportAssessment> {
        let mean = mean_score(scores);
        let overall = (mean * 10.0).round().clamp(0.0, 100.0) as u8;
        Ok(ReportAssessment {
            overall_score: overall,
            sub_scores: SubScores {
                communication: overall,
                technical: overall,
                problem_solving: overall,
                culture_fit: overall,
            },
            summary: format!(
                "The candidate answered {} question(s) with an average score of {:.1}.",
                transcript.len(),
                mean
            ),
            strengths: Vec::new(),
            improvements: Vec::new(),
            recommendations: Vec::new(),
        })
    }
}
