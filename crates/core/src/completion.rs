//! Completion Decision Engine
//!
//! A pure policy that turns a snapshot of session telemetry, coverage and
//! pacing into a verdict: keep going, steer toward an uncovered criterion,
//! or wrap up. The same snapshot, including `now`, always yields the same
//! result.

use crate::coverage::{CoverageSummary, CoverageTracker, Criterion};
use crate::settings::StageRuntimeSettings;
use crate::telemetry::SessionTelemetry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything the engine reads for one decision.
#[derive(Debug, Clone, Copy)]
pub struct CompletionSnapshot<'a> {
    pub coverage: &'a CoverageTracker,
    pub telemetry: &'a SessionTelemetry,
    pub questions_asked: u32,
    pub settings: &'a StageRuntimeSettings,
    pub pending_backlog_count: u32,
    /// Raw mean of per-answer 1-10 scores.
    pub avg_score: f64,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingStatus {
    Starting,
    OnTrack,
    MidInterview,
    WrappingSoon,
    Overtime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacingSnapshot {
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub progress_percent: u8,
    pub status: PacingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapUpReason {
    MaxQuestions,
    TimeLimit,
    CandidateFatigue,
    HighConfidenceNegative,
    HighConfidencePositive,
    SufficientCoverage,
}

impl WrapUpReason {
    pub fn as_str(self) -> &'static str {
        match self {
            WrapUpReason::MaxQuestions => "max_questions",
            WrapUpReason::TimeLimit => "time_limit",
            WrapUpReason::CandidateFatigue => "candidate_fatigue",
            WrapUpReason::HighConfidenceNegative => "high_confidence_negative",
            WrapUpReason::HighConfidencePositive => "high_confidence_positive",
            WrapUpReason::SufficientCoverage => "sufficient_coverage",
        }
    }

    /// The fixed rationale shown when a session ends for this reason.
    pub fn rationale(self) -> &'static str {
        match self {
            WrapUpReason::MaxQuestions => {
                "We've reached the maximum number of questions for this interview."
            }
            WrapUpReason::TimeLimit => "We've reached the time limit for this interview.",
            WrapUpReason::CandidateFatigue => {
                "Several answers in a row have been difficult, so we'll stop here to keep the session productive."
            }
            WrapUpReason::HighConfidenceNegative => {
                "We've gathered enough signal to make an assessment, so we'll wrap up here."
            }
            WrapUpReason::HighConfidencePositive => {
                "Your answers have been consistently strong and we've covered the key areas, so we can wrap up early."
            }
            WrapUpReason::SufficientCoverage => {
                "We've covered all the key areas for this interview."
            }
        }
    }
}

impl fmt::Display for WrapUpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason attached to every prioritize verdict.
pub const PRIORITIZE_REASON: &str = "critical_gap_near_time_limit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CompletionVerdict {
    Continue,
    Prioritize {
        topic: Criterion,
        reason: String,
        message: String,
    },
    WrapUp {
        reason: WrapUpReason,
        message: String,
    },
}

impl CompletionVerdict {
    pub fn name(&self) -> &'static str {
        match self {
            CompletionVerdict::Continue => "continue",
            CompletionVerdict::Prioritize { .. } => "prioritize",
            CompletionVerdict::WrapUp { .. } => "wrap_up",
        }
    }

    pub fn is_wrap_up(&self) -> bool {
        matches!(self, CompletionVerdict::WrapUp { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionDecisionResult {
    #[serde(flatten)]
    pub verdict: CompletionVerdict,
    pub pacing: PacingSnapshot,
    pub coverage: CoverageSummary,
    pub pending_backlog_count: u32,
}

/// Classifies elapsed time against the configured duration window.
pub fn compute_pacing(
    started_at: DateTime<Utc>,
    now: DateTime<Utc>,
    settings: &StageRuntimeSettings,
) -> PacingSnapshot {
    let elapsed_ms = (now - started_at).num_milliseconds().max(0) as u64;
    let elapsed = elapsed_ms as f64;
    let min = settings.min_duration_ms as f64;
    let max = settings.max_duration_ms as f64;

    let progress = if max > 0.0 {
        (elapsed / max * 100.0).round().min(100.0)
    } else {
        100.0
    };

    let status = if elapsed < 0.3 * min {
        PacingStatus::Starting
    } else if elapsed < min {
        PacingStatus::OnTrack
    } else if elapsed < (min + max) / 2.0 {
        PacingStatus::MidInterview
    } else if elapsed < 0.9 * max {
        PacingStatus::WrappingSoon
    } else {
        PacingStatus::Overtime
    };

    PacingSnapshot {
        elapsed_ms,
        remaining_ms: settings.max_duration_ms.saturating_sub(elapsed_ms),
        progress_percent: progress as u8,
        status,
    }
}

/// Decides whether the interview should continue, prioritize a gap, or end.
///
/// Rules are checked in a fixed order and the first match wins.
pub fn evaluate_completion(snapshot: &CompletionSnapshot<'_>) -> CompletionDecisionResult {
    let settings = snapshot.settings;
    let telemetry = snapshot.telemetry;
    let pacing = compute_pacing(telemetry.started_at, snapshot.now, settings);
    let coverage = snapshot.coverage.summarize(&settings.critical_criteria);

    let asked = snapshot.questions_asked;
    let past_minimum = asked >= settings.min_questions;
    let coverage_met = coverage.overall >= settings.thresholds.overall
        && coverage.critical >= settings.thresholds.critical;

    let wrap_up_reason = if asked >= settings.max_questions {
        Some(WrapUpReason::MaxQuestions)
    } else if pacing.status == PacingStatus::Overtime {
        Some(WrapUpReason::TimeLimit)
    } else if telemetry.low_score_streak >= 3 && past_minimum {
        Some(WrapUpReason::CandidateFatigue)
    } else if snapshot.avg_score < 4.0 && past_minimum && telemetry.low_score_streak >= 2 {
        Some(WrapUpReason::HighConfidenceNegative)
    } else if snapshot.avg_score >= 8.0
        && telemetry.high_score_streak >= 3
        && past_minimum
        && coverage_met
    {
        Some(WrapUpReason::HighConfidencePositive)
    } else if past_minimum && coverage_met {
        Some(WrapUpReason::SufficientCoverage)
    } else {
        None
    };

    let verdict = match wrap_up_reason {
        Some(reason) => CompletionVerdict::WrapUp {
            reason,
            message: reason.rationale().to_string(),
        },
        None => match coverage.gaps.first() {
            Some(&topic) if pacing.status == PacingStatus::WrappingSoon => {
                CompletionVerdict::Prioritize {
                    topic,
                    reason: PRIORITIZE_REASON.to_string(),
                    message: format!(
                        "We're running short on time, so let's make sure we cover {} before we finish.",
                        topic.label()
                    ),
                }
            }
            _ => CompletionVerdict::Continue,
        },
    };

    CompletionDecisionResult {
        verdict,
        pacing,
        coverage,
        pending_backlog_count: snapshot.pending_backlog_count,
    }
}

/// An advisory sentence for the interviewer when time is short and critical
/// criteria remain uncovered; `None` otherwise.
pub fn generate_pacing_notice(pacing: &PacingSnapshot, gaps: &[Criterion]) -> Option<String> {
    if pacing.status != PacingStatus::WrappingSoon || gaps.is_empty() {
        return None;
    }
    let labels: Vec<&str> = gaps.iter().map(|c| c.label()).collect();
    let minutes_left = pacing.remaining_ms.div_ceil(60_000);
    Some(format!(
        "About {} minute(s) remain and {} still need attention.",
        minutes_left,
        labels.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::CriterionContribution;
    use chrono::Duration;

    const MIN: i64 = 20;
    const MAX: i64 = 40;

    fn settings(min_q: u32, max_q: u32) -> StageRuntimeSettings {
        StageRuntimeSettings {
            min_duration_ms: (MIN * 60_000) as u64,
            max_duration_ms: (MAX * 60_000) as u64,
            target_duration_ms: None,
            min_questions: min_q,
            max_questions: max_q,
            thresholds: crate::settings::SufficiencyThresholds {
                overall: 0.6,
                critical: 0.7,
            },
            critical_criteria: vec![Criterion::Skills, Criterion::Behavioral],
        }
    }

    fn covered(score: f64) -> CoverageTracker {
        let mut tracker = CoverageTracker::new();
        let contributions: Vec<_> = Criterion::ALL
            .into_iter()
            .map(|criterion| CriterionContribution {
                criterion,
                score,
                note: None,
            })
            .collect();
        tracker.apply(&contributions);
        tracker
    }

    struct Fixture {
        coverage: CoverageTracker,
        telemetry: SessionTelemetry,
        settings: StageRuntimeSettings,
        started: DateTime<Utc>,
    }

    impl Fixture {
        fn new(min_q: u32, max_q: u32) -> Self {
            let started = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            Self {
                coverage: CoverageTracker::new(),
                telemetry: SessionTelemetry::new(started),
                settings: settings(min_q, max_q),
                started,
            }
        }

        fn decide(&self, asked: u32, avg: f64, minutes: i64) -> CompletionDecisionResult {
            evaluate_completion(&CompletionSnapshot {
                coverage: &self.coverage,
                telemetry: &self.telemetry,
                questions_asked: asked,
                settings: &self.settings,
                pending_backlog_count: 0,
                avg_score: avg,
                now: self.started + Duration::minutes(minutes),
            })
        }
    }

    fn reason(result: &CompletionDecisionResult) -> Option<WrapUpReason> {
        match result.verdict {
            CompletionVerdict::WrapUp { reason, .. } => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn test_pacing_status_boundaries() {
        let s = settings(1, 10);
        let start = Utc::now();
        let at = |ms: i64| compute_pacing(start, start + Duration::milliseconds(ms), &s).status;
        let min = MIN * 60_000;
        let max = MAX * 60_000;

        assert_eq!(at(0), PacingStatus::Starting);
        assert_eq!(at(min * 3 / 10 - 1), PacingStatus::Starting);
        assert_eq!(at(min * 3 / 10), PacingStatus::OnTrack);
        assert_eq!(at(min - 1), PacingStatus::OnTrack);
        assert_eq!(at(min), PacingStatus::MidInterview);
        assert_eq!(at((min + max) / 2 - 1), PacingStatus::MidInterview);
        assert_eq!(at((min + max) / 2), PacingStatus::WrappingSoon);
        assert_eq!(at(max * 9 / 10 - 1), PacingStatus::WrappingSoon);
        assert_eq!(at(max * 9 / 10), PacingStatus::Overtime);
    }

    #[test]
    fn test_progress_percent_rounds_and_caps() {
        let s = settings(1, 10);
        let start = Utc::now();
        let p = compute_pacing(start, start + Duration::minutes(10), &s);
        assert_eq!(p.progress_percent, 25);
        let p = compute_pacing(start, start + Duration::seconds(6 * 60 + 3), &s);
        assert_eq!(p.progress_percent, 15);
        let p = compute_pacing(start, start + Duration::minutes(90), &s);
        assert_eq!(p.progress_percent, 100);
        assert_eq!(p.remaining_ms, 0);
        let p = compute_pacing(start, start - Duration::minutes(1), &s);
        assert_eq!(p.elapsed_ms, 0);
    }

    #[test]
    fn test_hard_cap_wraps_up_regardless_of_state() {
        let mut f = Fixture::new(3, 5);
        f.telemetry.low_score_streak = 5;
        assert_eq!(reason(&f.decide(5, 2.0, 39)), Some(WrapUpReason::MaxQuestions));
        f.coverage = covered(1.0);
        assert_eq!(reason(&f.decide(5, 9.0, 1)), Some(WrapUpReason::MaxQuestions));
    }

    #[test]
    fn test_minimum_floor_blocks_sufficient_coverage() {
        let mut f = Fixture::new(3, 5);
        f.coverage = covered(0.9);
        let result = f.decide(2, 6.0, 5);
        assert_eq!(result.verdict, CompletionVerdict::Continue);
        assert!(result.coverage.overall >= 0.9 - 1e-9);
    }

    #[test]
    fn test_fatigue_preempts_coverage() {
        let mut f = Fixture::new(3, 8);
        f.coverage = covered(1.0);
        f.telemetry.low_score_streak = 3;
        assert_eq!(
            reason(&f.decide(4, 5.0, 10)),
            Some(WrapUpReason::CandidateFatigue)
        );
    }

    #[test]
    fn test_overtime_preempts_fatigue() {
        let mut f = Fixture::new(3, 8);
        f.telemetry.low_score_streak = 3;
        assert_eq!(reason(&f.decide(4, 3.0, MAX)), Some(WrapUpReason::TimeLimit));
    }

    #[test]
    fn test_fatigue_requires_minimum_questions() {
        let mut f = Fixture::new(3, 8);
        f.telemetry.low_score_streak = 3;
        assert_eq!(f.decide(2, 2.0, 5).verdict, CompletionVerdict::Continue);
    }

    #[test]
    fn test_high_confidence_negative() {
        let mut f = Fixture::new(3, 8);
        f.telemetry.low_score_streak = 2;
        assert_eq!(
            reason(&f.decide(3, 3.5, 10)),
            Some(WrapUpReason::HighConfidenceNegative)
        );
        assert_eq!(f.decide(3, 4.0, 10).verdict, CompletionVerdict::Continue);
    }

    #[test]
    fn test_high_confidence_positive_needs_coverage() {
        let mut f = Fixture::new(3, 8);
        f.telemetry.high_score_streak = 3;
        assert_eq!(f.decide(3, 8.5, 10).verdict, CompletionVerdict::Continue);

        f.coverage = covered(0.8);
        assert_eq!(
            reason(&f.decide(3, 8.5, 10)),
            Some(WrapUpReason::HighConfidencePositive)
        );
        // Same coverage without the streak falls through to sufficiency.
        f.telemetry.high_score_streak = 2;
        assert_eq!(
            reason(&f.decide(3, 8.5, 10)),
            Some(WrapUpReason::SufficientCoverage)
        );
    }

    #[test]
    fn test_sufficient_coverage_checks_both_thresholds() {
        let mut f = Fixture::new(2, 8);
        // Overall high, critical criteria untouched.
        f.coverage.apply(&[
            CriterionContribution {
                criterion: Criterion::Background,
                score: 1.0,
                note: None,
            },
            CriterionContribution {
                criterion: Criterion::Motivation,
                score: 1.0,
                note: None,
            },
            CriterionContribution {
                criterion: Criterion::CultureFit,
                score: 1.0,
                note: None,
            },
            CriterionContribution {
                criterion: Criterion::Logistics,
                score: 1.0,
                note: None,
            },
        ]);
        assert_eq!(f.decide(3, 6.0, 10).verdict, CompletionVerdict::Continue);
    }

    #[test]
    fn test_prioritize_first_declared_gap_when_wrapping_soon() {
        let mut f = Fixture::new(3, 10);
        f.settings.critical_criteria = vec![Criterion::Logistics, Criterion::Skills];
        f.coverage.apply(&[CriterionContribution {
            criterion: Criterion::Skills,
            score: 0.1,
            note: None,
        }]);
        // Skills has the lower score but Logistics is declared first.
        f.coverage.apply(&[CriterionContribution {
            criterion: Criterion::Logistics,
            score: 0.2,
            note: None,
        }]);
        let result = f.decide(4, 6.0, 31);
        assert_eq!(result.pacing.status, PacingStatus::WrappingSoon);
        match result.verdict {
            CompletionVerdict::Prioritize {
                topic,
                reason,
                message,
            } => {
                assert_eq!(topic, Criterion::Logistics);
                assert_eq!(reason, PRIORITIZE_REASON);
                assert!(message.contains("Logistics & Availability"));
            }
            other => panic!("expected prioritize, got {:?}", other),
        }
    }

    #[test]
    fn test_gaps_outside_wrapping_soon_continue() {
        let f = Fixture::new(3, 10);
        assert_eq!(f.decide(4, 6.0, 25).verdict, CompletionVerdict::Continue);
    }

    #[test]
    fn test_decision_is_pure() {
        let mut f = Fixture::new(3, 10);
        f.telemetry.low_score_streak = 1;
        f.coverage = covered(0.4);
        let first = f.decide(4, 5.5, 31);
        let second = f.decide(4, 5.5, 31);
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_reason_has_rationale() {
        for reason in [
            WrapUpReason::MaxQuestions,
            WrapUpReason::TimeLimit,
            WrapUpReason::CandidateFatigue,
            WrapUpReason::HighConfidenceNegative,
            WrapUpReason::HighConfidencePositive,
            WrapUpReason::SufficientCoverage,
        ] {
            assert!(!reason.rationale().is_empty());
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }

    #[test]
    fn test_verdict_serializes_with_action_tag() {
        let f = Fixture::new(3, 5);
        let json = serde_json::to_value(f.decide(5, 5.0, 1)).unwrap();
        assert_eq!(json["action"], "wrap_up");
        assert_eq!(json["reason"], "max_questions");
        assert_eq!(json["pacing"]["status"], "starting");
    }

    #[test]
    fn test_pacing_notice_only_when_wrapping_soon_with_gaps() {
        let s = settings(1, 10);
        let start = Utc::now();
        let wrapping = compute_pacing(start, start + Duration::minutes(32), &s);
        let early = compute_pacing(start, start + Duration::minutes(5), &s);

        let notice = generate_pacing_notice(&wrapping, &[Criterion::Skills, Criterion::Motivation])
            .expect("notice expected");
        assert!(notice.contains("Skills & Expertise, Motivation & Interest"));
        assert!(notice.contains("About 8 minute"));

        assert!(generate_pacing_notice(&wrapping, &[]).is_none());
        assert!(generate_pacing_notice(&early, &[Criterion::Skills]).is_none());
    }
}
