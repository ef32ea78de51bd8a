//! Final Aggregation
//!
//! Rolls a finished session's transcript and per-answer scores into the
//! closing report. The raw 1-10 answer mean is carried next to the 0-100
//! report score and is never derived from it.

use crate::capability::InterviewerService;
use crate::completion::WrapUpReason;
use crate::interview::Question;
use anyhow::{Result, ensure};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One answered question, as handed to the report generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub index: u32,
    pub question: String,
    pub answer: String,
    pub score: Option<u8>,
}

/// 0-100 sub-scores of the closing report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SubScores {
    pub communication: u8,
    pub technical: u8,
    pub problem_solving: u8,
    pub culture_fit: u8,
}

/// What the scoring capability produces for a finished transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportAssessment {
    /// Overall score from 0 to 100.
    pub overall_score: u8,
    pub sub_scores: SubScores,
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl ReportAssessment {
    fn validate(&self) -> Result<()> {
        let s = &self.sub_scores;
        for (name, value) in [
            ("overall_score", self.overall_score),
            ("communication", s.communication),
            ("technical", s.technical),
            ("problem_solving", s.problem_solving),
            ("culture_fit", s.culture_fit),
        ] {
            ensure!(value <= 100, "report field '{}' out of range: {}", name, value);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    #[serde(flatten)]
    pub assessment: ReportAssessment,
    /// Raw mean of the 1-10 answer scores.
    pub average_answer_score: f64,
    pub answered_questions: u32,
    pub wrap_up_reason: WrapUpReason,
}

/// Answered questions in index order.
pub fn build_transcript(questions: &[Question]) -> Vec<TranscriptEntry> {
    let mut transcript: Vec<TranscriptEntry> = questions
        .iter()
        .filter_map(|q| {
            q.candidate_answer.as_ref().map(|answer| TranscriptEntry {
                index: q.index,
                question: q.text.clone(),
                answer: answer.clone(),
                score: q.score,
            })
        })
        .collect();
    transcript.sort_by_key(|entry| entry.index);
    transcript
}

pub fn mean_score(scores: &[u8]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64
}

/// Asks the scoring capability for the closing assessment and assembles the report.
pub async fn aggregate(
    capability: &dyn InterviewerService,
    questions: &[Question],
    scores: &[u8],
    reason: WrapUpReason,
) -> Result<FinalReport> {
    let transcript = build_transcript(questions);
    let assessment = capability.generate_final_report(&transcript, scores).await?;
    assessment.validate()?;
    Ok(FinalReport {
        assessment,
        average_answer_score: mean_score(scores),
        answered_questions: transcript.len() as u32,
        wrap_up_reason: reason,
    })
}
