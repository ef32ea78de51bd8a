//! Interview Orchestrator
//!
//! Drives the turn loop of an interview session: starts sessions, accepts
//! answers for the single open question, updates memory, coverage and
//! telemetry, consults the completion engine, and applies its verdict.
//!
//! Each turn runs against a private working copy claimed from the
//! [`SessionManager`]. Nothing is published until every capability call of
//! the turn has succeeded, so a failed call can be retried verbatim.

use crate::capability::{AnswerEvaluation, InterviewerService, QuestionContext};
use crate::completion::{
    CompletionDecisionResult, CompletionSnapshot, CompletionVerdict, evaluate_completion,
    generate_pacing_notice,
};
use crate::coverage::Criterion;
use crate::error::{InterviewError, Result};
use crate::interview::{
    InterviewConfig, InterviewSession, Question, QuestionKind, SessionStatus,
};
use crate::memory::ConversationMemory;
use crate::report::{FinalReport, aggregate};
use crate::session_store::{SessionManager, SessionRecord, TurnGuard};
use crate::settings::StageRuntimeSettings;
use crate::sources::{Clock, RandomSource, SeededRandom, SystemClock};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Tunables for the turn loop.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Chance that an eligible turn gets a reflection.
    pub reflection_probability: f64,
    /// Answers shorter than this never get a reflection.
    pub reflection_min_words: usize,
    /// How long past its maximum duration an abandoned session keeps memory.
    pub memory_ttl_margin: Duration,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            reflection_probability: 0.4,
            reflection_min_words: 15,
            memory_ttl_margin: Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedInterview {
    pub session: InterviewSession,
    pub first_question: Question,
    pub introduction: Option<String>,
}

/// Everything produced by one accepted answer.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub evaluation: AnswerEvaluation,
    pub decision: CompletionDecisionResult,
    pub next_question: Option<Question>,
    /// Shown before a prioritized question.
    pub transition: Option<String>,
    pub reflection: Option<String>,
    /// Advisory for the interviewer when time is short and gaps remain.
    pub pacing_notice: Option<String>,
    pub closing_message: Option<String>,
    pub final_report: Option<FinalReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: u32,
    pub total: u32,
    pub percent: u8,
}

impl Progress {
    pub fn of(session: &InterviewSession) -> Self {
        let current = session.current_question_index;
        let total = session.total_questions;
        let percent = if total == 0 {
            100
        } else {
            (f64::from(current) / f64::from(total) * 100.0)
                .round()
                .min(100.0) as u8
        };
        Self {
            current,
            total,
            percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionOverview {
    pub session: InterviewSession,
    pub questions: Vec<Question>,
    pub feedback: Option<FinalReport>,
    pub progress: Progress,
}

pub struct InterviewOrchestrator {
    capability: Arc<dyn InterviewerService>,
    sessions: Arc<SessionManager>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    options: OrchestratorOptions,
}

impl InterviewOrchestrator {
    pub fn new(capability: Arc<dyn InterviewerService>, options: OrchestratorOptions) -> Self {
        Self {
            capability,
            sessions: Arc::new(SessionManager::new(options.memory_ttl_margin)),
            clock: Arc::new(SystemClock),
            random: Arc::new(SeededRandom::from_os_rng()),
            options,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Validates the configuration, obtains the opening content and
    /// registers the session with its first open question.
    #[instrument(skip_all, fields(candidate_id = %candidate_id, interview_type = %config.interview_type))]
    pub async fn start_session(
        &self,
        candidate_id: &str,
        config: InterviewConfig,
    ) -> Result<StartedInterview> {
        if candidate_id.trim().is_empty() {
            return Err(InterviewError::Validation(
                "candidateId must not be empty".to_string(),
            ));
        }
        let (settings, total_questions) = StageRuntimeSettings::resolve(&config)?;

        let introduction = if config.introduction {
            Some(
                self.capability
                    .generate_introduction(&config)
                    .await
                    .map_err(InterviewError::CapabilityFailure)?,
            )
        } else {
            None
        };

        let context = QuestionContext {
            interview_type: config.interview_type,
            target_role: config.target_role.clone(),
            difficulty: config.difficulty,
            kind: QuestionKind::Opening,
            index: 0,
            total_questions,
            history: Vec::new(),
            active_project: None,
            focus: None,
            candidate_context: config.context.clone(),
        };
        let text = self
            .capability
            .generate_question(&context)
            .await
            .map_err(InterviewError::CapabilityFailure)?;

        let now = self.clock.now();
        let session = InterviewSession {
            id: Uuid::new_v4(),
            candidate_id: candidate_id.to_string(),
            interview_type: config.interview_type,
            target_role: config.target_role.clone(),
            difficulty: config.difficulty,
            total_questions,
            current_question_index: 0,
            status: SessionStatus::InProgress,
            overall_score: None,
            started_at: now,
            completed_at: None,
        };
        let first_question = Question::new(session.id, 0, QuestionKind::Opening, text, now);
        let record = SessionRecord::new(
            session.clone(),
            config,
            settings,
            first_question.clone(),
        );
        self.sessions.insert(record, ConversationMemory::new());

        info!(session_id = %session.id, total_questions, "Interview started");
        Ok(StartedInterview {
            session,
            first_question,
            introduction,
        })
    }

    /// Accepts the answer to the session's open question and advances the
    /// interview according to the completion engine's verdict.
    #[instrument(skip_all, fields(session_id = %session_id, question_id = %question_id))]
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
        answer: &str,
    ) -> Result<TurnOutcome> {
        let mut turn = self.sessions.begin_turn(session_id, question_id)?;
        let now = self.clock.now();
        let (question_text, answered_kind) = turn
            .record
            .open_question()
            .map(|q| (q.text.clone(), q.kind))
            .ok_or_else(|| {
                InterviewError::Conflict(format!(
                    "Question '{}' is not the currently open question",
                    question_id
                ))
            })?;

        let evaluation = self
            .capability
            .evaluate_answer(&question_text, answer, &turn.record.config)
            .await
            .map_err(InterviewError::CapabilityFailure)?;
        if !(1..=10).contains(&evaluation.score) {
            return Err(InterviewError::CapabilityFailure(anyhow::anyhow!(
                "Evaluation score out of range: {}",
                evaluation.score
            )));
        }
        let contributions = self
            .capability
            .classify_coverage(&question_text, answer)
            .await
            .map_err(InterviewError::CapabilityFailure)?;

        Self::apply_evaluation(&mut turn, answer, &question_text, &evaluation, now);
        turn.record.coverage.apply(&contributions);
        turn.record.session.current_question_index += 1;

        let decision = self.decide(&turn, now);
        info!(
            score = evaluation.score,
            verdict = decision.verdict.name(),
            asked = turn.record.session.current_question_index,
            "Answer evaluated"
        );

        let mut outcome = TurnOutcome {
            evaluation,
            decision: decision.clone(),
            next_question: None,
            transition: None,
            reflection: None,
            pacing_notice: None,
            closing_message: None,
            final_report: None,
        };

        match decision.verdict {
            CompletionVerdict::WrapUp { reason, .. } => {
                let closing = self
                    .capability
                    .generate_closing(&turn.record.config)
                    .await
                    .map_err(InterviewError::CapabilityFailure)?;
                let report = aggregate(
                    self.capability.as_ref(),
                    &turn.record.questions,
                    turn.memory.scores(),
                    reason,
                )
                .await
                .map_err(InterviewError::CapabilityFailure)?;

                let session = &mut turn.record.session;
                session.status = SessionStatus::Completed;
                session.completed_at = Some(now);
                session.overall_score = Some(report.assessment.overall_score);
                turn.record.final_report = Some(report.clone());

                info!(%reason, overall_score = report.assessment.overall_score, "Interview completed");
                outcome.closing_message = Some(closing);
                outcome.final_report = Some(report);
            }
            CompletionVerdict::Prioritize { topic, message, .. } => {
                let next = self.ask_next(&mut turn, Some(topic), now).await?;
                info!(%topic, "Prioritizing uncovered criterion");
                outcome.transition = Some(message);
                outcome.next_question = Some(next);
            }
            CompletionVerdict::Continue => {
                let next = self.ask_next(&mut turn, None, now).await?;
                if self.reflection_eligible(answered_kind, next.kind, answer) {
                    outcome.reflection = self.reflect(&mut turn.memory, answer).await;
                }
                outcome.next_question = Some(next);
            }
        }

        if !turn.record.session.is_completed() {
            outcome.pacing_notice =
                generate_pacing_notice(&outcome.decision.pacing, &outcome.decision.coverage.gaps);
        }
        turn.commit();
        Ok(outcome)
    }

    /// Read-only snapshot of a session and its questions.
    pub fn get_status(&self, session_id: Uuid) -> Result<SessionOverview> {
        let record = self.sessions.get(session_id)?;
        Ok(SessionOverview {
            progress: Progress::of(&record.session),
            session: record.session,
            questions: record.questions,
            feedback: record.final_report,
        })
    }

    pub fn progress(&self, session_id: Uuid) -> Result<Progress> {
        Ok(Progress::of(&self.sessions.get(session_id)?.session))
    }

    /// Evicts memory of abandoned sessions as of the orchestrator's clock.
    pub fn sweep_expired(&self) -> usize {
        self.sessions.sweep_expired(self.clock.now())
    }

    fn apply_evaluation(
        turn: &mut TurnGuard,
        answer: &str,
        question_text: &str,
        evaluation: &AnswerEvaluation,
        now: DateTime<Utc>,
    ) {
        if let Some(question) = turn.record.open_question_mut() {
            question.candidate_answer = Some(answer.to_string());
            question.score = Some(evaluation.score);
            question.feedback = Some(evaluation.feedback.clone());
            question.strengths = evaluation.strengths.clone();
            question.improvements = evaluation.improvements.clone();
            question.project_mentioned = evaluation.project_mentioned.clone();
            question.answered_at = Some(now);
        }
        turn.memory.record_turn(question_text, answer, evaluation);

        let telemetry = &mut turn.record.telemetry;
        telemetry.record_score(evaluation.score);
        if let Some(confidence) = evaluation.confidence {
            telemetry.record_confidence(confidence);
        }
        turn.record.current_difficulty = turn.record.current_difficulty.adjusted_for(evaluation.score);
    }

    fn decide(&self, turn: &TurnGuard, now: DateTime<Utc>) -> CompletionDecisionResult {
        let record = &turn.record;
        let asked = record.session.current_question_index;
        evaluate_completion(&CompletionSnapshot {
            coverage: &record.coverage,
            telemetry: &record.telemetry,
            questions_asked: asked,
            settings: &record.settings,
            pending_backlog_count: record.session.total_questions.saturating_sub(asked),
            avg_score: turn.memory.average_score(),
            now,
        })
    }

    /// Generates and opens the next question on the working copy.
    async fn ask_next(
        &self,
        turn: &mut TurnGuard,
        focus: Option<Criterion>,
        now: DateTime<Utc>,
    ) -> Result<Question> {
        let record = &mut turn.record;
        let index = record.session.current_question_index;
        let active_project = turn.memory.active_project().map(str::to_string);
        let kind = if focus.is_some() {
            QuestionKind::Main
        } else if index + 1 >= record.session.total_questions {
            QuestionKind::Closing
        } else if active_project.is_some() {
            QuestionKind::FollowUp
        } else {
            QuestionKind::Main
        };

        let context = QuestionContext {
            interview_type: record.config.interview_type,
            target_role: record.config.target_role.clone(),
            difficulty: record.current_difficulty,
            kind,
            index,
            total_questions: record.session.total_questions,
            history: turn.memory.history(),
            active_project,
            focus,
            candidate_context: record.config.context.clone(),
        };
        let text = self
            .capability
            .generate_question(&context)
            .await
            .map_err(InterviewError::CapabilityFailure)?;

        if kind == QuestionKind::FollowUp {
            record.telemetry.follow_ups_used += 1;
        }
        let question = Question::new(record.session.id, index, kind, text, now);
        record.questions.push(question.clone());
        Ok(question)
    }

    fn reflection_eligible(&self, answered: QuestionKind, next: QuestionKind, answer: &str) -> bool {
        answered != QuestionKind::Opening
            && next != QuestionKind::Closing
            && answer.split_whitespace().count() >= self.options.reflection_min_words
            && self.random.chance(self.options.reflection_probability)
    }

    /// Reflections are narration only; a failed call is logged and skipped.
    async fn reflect(&self, memory: &mut ConversationMemory, answer: &str) -> Option<String> {
        let previous = memory.last_reflection().map(str::to_string);
        match self.capability.generate_reflection(answer, previous).await {
            Ok(reflection) => {
                memory.set_last_reflection(reflection.clone());
                reflection
            }
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(%error, "Reflection generation failed; skipping");
                None
            }
        }
    }
}
