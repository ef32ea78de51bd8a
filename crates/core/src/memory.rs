//! Conversation Memory
//!
//! Append-only log of one session's turns, consumed as context by the
//! question and evaluation capabilities. It also tracks the "active project":
//! a recurring example the candidate keeps returning to, which is dropped
//! after a fixed number of consecutive mentions so questioning moves on.

use crate::capability::AnswerEvaluation;
use crate::interview::Question;
use crate::report::mean_score;
use serde::{Deserialize, Serialize};

/// Consecutive mentions after which the active project is cleared.
pub const PROJECT_MENTION_LIMIT: u32 = 3;

/// One prior question/answer pair, as handed to the capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMemory {
    questions: Vec<String>,
    answers: Vec<String>,
    scores: Vec<u8>,
    evaluations: Vec<AnswerEvaluation>,
    active_project: Option<String>,
    project_mention_count: u32,
    last_reflection: Option<String>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replays a session's answered questions in index order. Used when the
    /// memory of a session was evicted; the last reflection is not recovered.
    pub fn from_questions(questions: &[Question]) -> Self {
        let mut answered: Vec<&Question> = questions
            .iter()
            .filter(|q| q.candidate_answer.is_some() && q.score.is_some())
            .collect();
        answered.sort_by_key(|q| q.index);

        let mut memory = Self::new();
        for question in answered {
            let (Some(answer), Some(score)) = (&question.candidate_answer, question.score) else {
                continue;
            };
            let evaluation = AnswerEvaluation {
                score,
                feedback: question.feedback.clone().unwrap_or_default(),
                strengths: question.strengths.clone(),
                improvements: question.improvements.clone(),
                project_mentioned: question.project_mentioned.clone(),
                confidence: None,
            };
            memory.record_turn(&question.text, answer, &evaluation);
        }
        memory
    }

    /// Appends the outcome of one accepted turn and applies the
    /// active-project rule to its `project_mentioned`.
    pub fn record_turn(&mut self, question: &str, answer: &str, evaluation: &AnswerEvaluation) {
        self.questions.push(question.to_string());
        self.answers.push(answer.to_string());
        self.scores.push(evaluation.score);
        self.evaluations.push(evaluation.clone());
        self.note_project(evaluation.project_mentioned.as_deref());
    }

    fn note_project(&mut self, mentioned: Option<&str>) {
        let Some(project) = mentioned.map(str::trim).filter(|p| !p.is_empty()) else {
            return;
        };
        if self.active_project.as_deref() == Some(project) {
            self.project_mention_count += 1;
        } else {
            self.active_project = Some(project.to_string());
            self.project_mention_count = 1;
        }
        if self.project_mention_count >= PROJECT_MENTION_LIMIT {
            self.active_project = None;
            self.project_mention_count = 0;
        }
    }

    pub fn set_last_reflection(&mut self, reflection: Option<String>) {
        if reflection.is_some() {
            self.last_reflection = reflection;
        }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn scores(&self) -> &[u8] {
        &self.scores
    }

    pub fn evaluations(&self) -> &[AnswerEvaluation] {
        &self.evaluations
    }

    pub fn active_project(&self) -> Option<&str> {
        self.active_project.as_deref()
    }

    pub fn project_mention_count(&self) -> u32 {
        self.project_mention_count
    }

    pub fn last_reflection(&self) -> Option<&str> {
        self.last_reflection.as_deref()
    }

    pub fn turns(&self) -> usize {
        self.answers.len()
    }

    pub fn history(&self) -> Vec<Exchange> {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| Exchange {
                question: q.clone(),
                answer: a.clone(),
            })
            .collect()
    }

    /// Raw mean of the recorded 1-10 scores; 0.0 before the first answer.
    pub fn average_score(&self) -> f64 {
        mean_score(&self.scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::QuestionKind;

    fn evaluation(score: u8, project: Option<&str>) -> AnswerEvaluation {
        AnswerEvaluation {
            score,
            feedback: "ok".into(),
            strengths: vec![],
            improvements: vec![],
            project_mentioned: project.map(String::from),
            confidence: None,
        }
    }

    #[test]
    fn test_record_turn_appends_in_order() {
        let mut memory = ConversationMemory::new();
        memory.record_turn("Q1", "A1", &evaluation(6, None));
        memory.record_turn("Q2", "A2", &evaluation(8, None));

        assert_eq!(memory.questions(), ["Q1", "Q2"]);
        assert_eq!(memory.answers(), ["A1", "A2"]);
        assert_eq!(memory.scores(), [6, 8]);
        assert_eq!(memory.evaluations().len(), 2);
        assert_eq!(memory.history()[1].question, "Q2");
        assert_eq!(memory.average_score(), 7.0);
    }

    #[test]
    fn test_average_of_empty_memory_is_zero() {
        assert_eq!(ConversationMemory::new().average_score(), 0.0);
    }

    #[test]
    fn test_project_cleared_after_three_consecutive_mentions() {
        let mut memory = ConversationMemory::new();
        memory.record_turn("Q1", "A1", &evaluation(7, Some("PaymentsAPI")));
        assert_eq!(memory.active_project(), Some("PaymentsAPI"));
        assert_eq!(memory.project_mention_count(), 1);

        memory.record_turn("Q2", "A2", &evaluation(7, Some("PaymentsAPI")));
        assert_eq!(memory.project_mention_count(), 2);

        memory.record_turn("Q3", "A3", &evaluation(7, Some("PaymentsAPI")));
        assert_eq!(memory.active_project(), None);
        assert_eq!(memory.project_mention_count(), 0);
    }

    #[test]
    fn test_new_project_replaces_and_resets_count() {
        let mut memory = ConversationMemory::new();
        memory.record_turn("Q1", "A1", &evaluation(7, Some("PaymentsAPI")));
        memory.record_turn("Q2", "A2", &evaluation(7, Some("PaymentsAPI")));
        memory.record_turn("Q3", "A3", &evaluation(7, Some("SearchIndexer")));
        assert_eq!(memory.active_project(), Some("SearchIndexer"));
        assert_eq!(memory.project_mention_count(), 1);
    }

    #[test]
    fn test_missing_project_leaves_tracking_untouched() {
        let mut memory = ConversationMemory::new();
        memory.record_turn("Q1", "A1", &evaluation(7, Some("PaymentsAPI")));
        memory.record_turn("Q2", "A2", &evaluation(7, None));
        memory.record_turn("Q3", "A3", &evaluation(7, Some("  ")));
        assert_eq!(memory.active_project(), Some("PaymentsAPI"));
        assert_eq!(memory.project_mention_count(), 1);
    }

    #[test]
    fn test_rebuild_from_questions_replays_answered_turns() {
        let session_id = uuid::Uuid::new_v4();
        let now = chrono::Utc::now();
        let mut questions = Vec::new();
        for (index, score) in [(1u32, 2u8), (0, 9)] {
            let mut q = Question::new(session_id, index, QuestionKind::Main, format!("Q{}", index), now);
            q.candidate_answer = Some(format!("A{}", index));
            q.score = Some(score);
            q.project_mentioned = Some("Ledger".into());
            questions.push(q);
        }
        questions.push(Question::new(session_id, 2, QuestionKind::Main, "Q2", now));

        let memory = ConversationMemory::from_questions(&questions);
        assert_eq!(memory.questions(), ["Q0", "Q1"]);
        assert_eq!(memory.answers(), ["A0", "A1"]);
        assert_eq!(memory.scores(), [9, 2]);
        assert_eq!(memory.active_project(), Some("Ledger"));
        assert_eq!(memory.project_mention_count(), 2);
        assert_eq!(memory.last_reflection(), None);
    }

    #[test]
    fn test_last_reflection_keeps_previous_when_none() {
        let mut memory = ConversationMemory::new();
        memory.set_last_reflection(Some("Thanks, that's clear.".into()));
        memory.set_last_reflection(None);
        assert_eq!(memory.last_reflection(), Some("Thanks, that's clear."));
    }
}
