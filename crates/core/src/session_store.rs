//! Session Manager
//!
//! Owns every live session record and its conversation memory. Records are
//! created when an interview starts; memory is evicted when the interview
//! completes or, for abandoned sessions, by [`SessionManager::sweep_expired`].
//!
//! A turn works on a private copy of the record obtained through
//! [`SessionManager::begin_turn`] and replaces the stored state only on
//! [`TurnGuard::commit`]. Dropping the guard without committing leaves the
//! stored state exactly as it was.

use crate::coverage::CoverageTracker;
use crate::error::{InterviewError, Result};
use crate::interview::{Difficulty, InterviewConfig, InterviewSession, Question};
use crate::memory::ConversationMemory;
use crate::report::FinalReport;
use crate::settings::StageRuntimeSettings;
use crate::telemetry::SessionTelemetry;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;

/// Everything the engine keeps about one session besides its memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub session: InterviewSession,
    pub config: InterviewConfig,
    pub settings: StageRuntimeSettings,
    pub questions: Vec<Question>,
    pub coverage: CoverageTracker,
    pub telemetry: SessionTelemetry,
    /// Difficulty for the next question after score-trend adjustments.
    pub current_difficulty: Difficulty,
    pub final_report: Option<FinalReport>,
    in_flight: Option<Uuid>,
}

impl SessionRecord {
    pub fn new(
        session: InterviewSession,
        config: InterviewConfig,
        settings: StageRuntimeSettings,
        first_question: Question,
    ) -> Self {
        let mut telemetry = SessionTelemetry::new(session.started_at);
        telemetry.mark_first_question(first_question.asked_at);
        Self {
            current_difficulty: session.difficulty,
            session,
            config,
            settings,
            questions: vec![first_question],
            coverage: CoverageTracker::new(),
            telemetry,
            final_report: None,
            in_flight: None,
        }
    }

    /// The single unanswered question, if the session is awaiting an answer.
    pub fn open_question(&self) -> Option<&Question> {
        self.questions.last().filter(|q| q.is_open())
    }

    pub fn open_question_mut(&mut self) -> Option<&mut Question> {
        self.questions.last_mut().filter(|q| q.is_open())
    }

    pub fn is_turn_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }
}

struct MemoryEntry {
    memory: ConversationMemory,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<Uuid, SessionRecord>,
    memories: HashMap<Uuid, MemoryEntry>,
}

/// Process-wide store of interview sessions.
///
/// The lock is only held for map access, never across a capability call,
/// so distinct sessions proceed independently.
pub struct SessionManager {
    inner: Mutex<Inner>,
    ttl_margin: Duration,
}

impl SessionManager {
    /// `ttl_margin` is how long past its maximum duration an abandoned
    /// session keeps its memory.
    pub fn new(ttl_margin: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ttl_margin,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Saturates at the latest representable instant instead of overflowing.
    fn expiry_for(&self, record: &SessionRecord) -> DateTime<Utc> {
        i64::try_from(record.settings.max_duration_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|max| record.session.started_at.checked_add_signed(max))
            .and_then(|end| end.checked_add_signed(self.ttl_margin))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn insert(&self, record: SessionRecord, memory: ConversationMemory) {
        let id = record.session.id;
        let expires_at = self.expiry_for(&record);
        let mut inner = self.lock();
        inner
            .memories
            .insert(id, MemoryEntry { memory, expires_at });
        inner.sessions.insert(id, record);
    }

    /// A read-only copy of a session record.
    pub fn get(&self, session_id: Uuid) -> Result<SessionRecord> {
        self.lock()
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| InterviewError::session_not_found(session_id))
    }

    /// A copy of the session's conversation memory, if still held.
    pub fn memory(&self, session_id: Uuid) -> Option<ConversationMemory> {
        self.lock()
            .memories
            .get(&session_id)
            .map(|entry| entry.memory.clone())
    }

    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn memory_count(&self) -> usize {
        self.lock().memories.len()
    }

    /// Claims the session for one `submitAnswer` turn.
    ///
    /// Fails with `NotFound` for an unknown session or question and with
    /// `Conflict` when the session is completed, the question is not the
    /// open one, or another turn is already in flight. No state changes on
    /// failure.
    pub fn begin_turn(self: &Arc<Self>, session_id: Uuid, question_id: Uuid) -> Result<TurnGuard> {
        let mut inner = self.lock();
        let record = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| InterviewError::session_not_found(session_id))?;

        if record.session.is_completed() {
            return Err(InterviewError::Conflict(format!(
                "Session '{}' is already completed",
                session_id
            )));
        }
        if !record.questions.iter().any(|q| q.id == question_id) {
            return Err(InterviewError::question_not_found(question_id));
        }
        if let Some(busy) = record.in_flight {
            return Err(InterviewError::Conflict(format!(
                "An answer for question '{}' is already being processed",
                busy
            )));
        }
        match record.open_question() {
            Some(open) if open.id == question_id => {}
            _ => {
                return Err(InterviewError::Conflict(format!(
                    "Question '{}' is not the currently open question",
                    question_id
                )));
            }
        }

        record.in_flight = Some(question_id);
        let mut working = record.clone();
        working.in_flight = None;

        let expires_at = self.expiry_for(&working);
        let memory = inner
            .memories
            .entry(session_id)
            .or_insert_with(|| {
                debug!(%session_id, "Rebuilding conversation memory from answered questions");
                MemoryEntry {
                    memory: ConversationMemory::from_questions(&working.questions),
                    expires_at,
                }
            })
            .memory
            .clone();

        Ok(TurnGuard {
            manager: Arc::clone(self),
            session_id,
            record: working,
            memory,
            committed: false,
        })
    }

    /// Evicts conversation memory of sessions whose maximum duration plus
    /// the TTL margin has elapsed. Returns the number of evicted entries.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.lock();
        let Inner { sessions, memories } = &mut *inner;
        let before = memories.len();
        memories.retain(|id, entry| {
            let busy = sessions.get(id).is_some_and(SessionRecord::is_turn_in_flight);
            busy || entry.expires_at > now
        });
        let evicted = before - memories.len();
        if evicted > 0 {
            info!(evicted, "Evicted conversation memory of abandoned sessions");
        }
        evicted
    }

    fn release(&self, session_id: Uuid) {
        if let Some(record) = self.lock().sessions.get_mut(&session_id) {
            record.in_flight = None;
        }
    }
}

/// Exclusive claim on a session for the duration of one turn.
///
/// `record` and `memory` are private working copies; mutate them freely and
/// call [`TurnGuard::commit`] to publish.
pub struct TurnGuard {
    manager: Arc<SessionManager>,
    session_id: Uuid,
    pub record: SessionRecord,
    pub memory: ConversationMemory,
    committed: bool,
}

impl TurnGuard {
    /// Publishes the working copies. Completed sessions drop their memory.
    pub fn commit(mut self) {
        let mut inner = self.manager.lock();
        let mut record = self.record.clone();
        record.in_flight = None;
        if record.session.is_completed() {
            inner.memories.remove(&self.session_id);
        } else {
            let expires_at = self.manager.expiry_for(&record);
            inner.memories.insert(
                self.session_id,
                MemoryEntry {
                    memory: self.memory.clone(),
                    expires_at,
                },
            );
        }
        inner.sessions.insert(self.session_id, record);
        self.committed = true;
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        if !self.committed {
            self.manager.release(self.session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::{InterviewType, QuestionKind, SessionStatus};

    fn record(started_at: DateTime<Utc>) -> SessionRecord {
        let config =
            InterviewConfig::new(InterviewType::HrScreen, "Recruiter", Difficulty::Medium, 4);
        let (settings, total) = StageRuntimeSettings::resolve(&config).unwrap();
        let session = InterviewSession {
            id: Uuid::new_v4(),
            candidate_id: "cand-1".into(),
            interview_type: config.interview_type,
            target_role: config.target_role.clone(),
            difficulty: config.difficulty,
            total_questions: total,
            current_question_index: 0,
            status: SessionStatus::InProgress,
            overall_score: None,
            started_at,
            completed_at: None,
        };
        let question = Question::new(session.id, 0, QuestionKind::Opening, "Hello?", started_at);
        SessionRecord::new(session, config, settings, question)
    }

    fn manager() -> Arc<SessionManager> {
        Arc::new(SessionManager::new(Duration::minutes(10)))
    }

    #[test]
    fn test_begin_turn_rejects_unknown_session_and_question() {
        let manager = manager();
        let r = record(Utc::now());
        let id = r.session.id;
        manager.insert(r, ConversationMemory::new());

        assert!(matches!(
            manager.begin_turn(Uuid::new_v4(), Uuid::new_v4()),
            Err(InterviewError::NotFound(_))
        ));
        assert!(matches!(
            manager.begin_turn(id, Uuid::new_v4()),
            Err(InterviewError::NotFound(_))
        ));
    }

    #[test]
    fn test_second_claim_conflicts_until_guard_dropped() {
        let manager = manager();
        let r = record(Utc::now());
        let (id, qid) = (r.session.id, r.questions[0].id);
        manager.insert(r, ConversationMemory::new());

        let guard = manager.begin_turn(id, qid).unwrap();
        assert!(matches!(
            manager.begin_turn(id, qid),
            Err(InterviewError::Conflict(_))
        ));
        drop(guard);
        assert!(manager.begin_turn(id, qid).is_ok());
    }

    #[test]
    fn test_uncommitted_guard_leaves_state_untouched() {
        let manager = manager();
        let r = record(Utc::now());
        let (id, qid) = (r.session.id, r.questions[0].id);
        let original = r.clone();
        manager.insert(r, ConversationMemory::new());

        {
            let mut guard = manager.begin_turn(id, qid).unwrap();
            guard.record.session.current_question_index = 9;
            guard.record.coverage = CoverageTracker::new();
            guard.record.questions[0].candidate_answer = Some("scratch".into());
        }
        assert_eq!(manager.get(id).unwrap(), original);
        assert_eq!(manager.memory(id), Some(ConversationMemory::new()));
    }

    #[test]
    fn test_commit_publishes_and_completion_drops_memory() {
        let manager = manager();
        let r = record(Utc::now());
        let (id, qid) = (r.session.id, r.questions[0].id);
        manager.insert(r, ConversationMemory::new());

        let mut guard = manager.begin_turn(id, qid).unwrap();
        guard.record.questions[0].candidate_answer = Some("done".into());
        guard.record.session.status = SessionStatus::Completed;
        guard.commit();

        let stored = manager.get(id).unwrap();
        assert!(stored.session.is_completed());
        assert!(!stored.is_turn_in_flight());
        assert!(manager.memory(id).is_none());
        assert!(matches!(
            manager.begin_turn(id, qid),
            Err(InterviewError::Conflict(_))
        ));
    }

    #[test]
    fn test_answered_question_cannot_be_replayed() {
        let manager = manager();
        let mut r = record(Utc::now());
        let first = r.questions[0].id;
        r.questions[0].candidate_answer = Some("answered".into());
        let next = Question::new(r.session.id, 1, QuestionKind::Main, "Next?", Utc::now());
        r.questions.push(next);
        let id = r.session.id;
        manager.insert(r, ConversationMemory::new());

        assert!(matches!(
            manager.begin_turn(id, first),
            Err(InterviewError::Conflict(_))
        ));
    }

    #[test]
    fn test_sweep_evicts_only_expired_memory() {
        let manager = manager();
        let now = Utc::now();
        let stale = record(now - Duration::hours(2));
        let fresh = record(now);
        let (stale_id, fresh_id) = (stale.session.id, fresh.session.id);
        manager.insert(stale, ConversationMemory::new());
        manager.insert(fresh, ConversationMemory::new());

        assert_eq!(manager.sweep_expired(now), 1);
        assert!(manager.memory(stale_id).is_none());
        assert!(manager.memory(fresh_id).is_some());
        assert_eq!(manager.session_count(), 2);
    }

    #[test]
    fn test_swept_memory_is_recreated_lazily() {
        let manager = manager();
        let now = Utc::now();
        let stale = record(now - Duration::hours(2));
        let (id, qid) = (stale.session.id, stale.questions[0].id);
        manager.insert(stale, ConversationMemory::new());
        manager.sweep_expired(now);

        let guard = manager.begin_turn(id, qid).unwrap();
        assert_eq!(guard.memory.turns(), 0);
        assert_eq!(manager.memory_count(), 1);
    }

    #[test]
    fn test_swept_memory_is_rebuilt_from_answered_questions() {
        let manager = manager();
        let now = Utc::now();
        let mut stale = record(now - Duration::hours(2));
        stale.questions[0].candidate_answer = Some("Yes, in May.".into());
        stale.questions[0].score = Some(9);
        let open = Question::new(stale.session.id, 1, QuestionKind::Main, "Why us?", now);
        let (id, qid) = (stale.session.id, open.id);
        stale.questions.push(open);
        stale.session.current_question_index = 1;
        manager.insert(stale, ConversationMemory::new());
        assert_eq!(manager.sweep_expired(now), 1);

        let guard = manager.begin_turn(id, qid).unwrap();
        assert_eq!(guard.memory.questions(), ["Hello?"]);
        assert_eq!(guard.memory.scores(), [9]);
    }

    #[test]
    fn test_oversized_max_duration_saturates_expiry() {
        let manager = manager();
        let now = Utc::now();
        for max_duration_ms in [u64::MAX, 1 << 62] {
            let mut r = record(now);
            r.settings.max_duration_ms = max_duration_ms;
            manager.insert(r, ConversationMemory::new());
        }
        assert_eq!(manager.sweep_expired(now + Duration::days(1)), 0);
        assert_eq!(manager.memory_count(), 2);
    }
}
