use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scores at or above this extend the high streak.
pub const HIGH_SCORE: u8 = 7;
/// Scores at or below this extend the low streak.
pub const LOW_SCORE: u8 = 4;

/// Live per-session signals read by the completion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTelemetry {
    pub started_at: DateTime<Utc>,
    pub first_question_at: Option<DateTime<Utc>>,
    pub follow_ups_used: u32,
    pub low_score_streak: u32,
    pub high_score_streak: u32,
    pub avg_confidence: Option<f64>,
    confidence_samples: u32,
}

impl SessionTelemetry {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            first_question_at: None,
            follow_ups_used: 0,
            low_score_streak: 0,
            high_score_streak: 0,
            avg_confidence: None,
            confidence_samples: 0,
        }
    }

    /// Updates both streaks for a new 1-10 answer score.
    pub fn record_score(&mut self, score: u8) {
        if score >= HIGH_SCORE {
            self.high_score_streak += 1;
            self.low_score_streak = 0;
        } else if score <= LOW_SCORE {
            self.low_score_streak += 1;
            self.high_score_streak = 0;
        } else {
            self.low_score_streak = 0;
            self.high_score_streak = 0;
        }
    }

    /// Folds an evaluator confidence into the running mean.
    pub fn record_confidence(&mut self, confidence: f64) {
        if !confidence.is_finite() {
            return;
        }
        let confidence = confidence.clamp(0.0, 1.0);
        let n = self.confidence_samples as f64;
        let mean = self.avg_confidence.unwrap_or(0.0);
        self.avg_confidence = Some((mean * n + confidence) / (n + 1.0));
        self.confidence_samples += 1;
    }

    pub fn mark_first_question(&mut self, at: DateTime<Utc>) {
        if self.first_question_at.is_none() {
            self.first_question_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn telemetry() -> SessionTelemetry {
        SessionTelemetry::new(Utc::now())
    }

    #[test]
    fn test_high_scores_build_high_streak() {
        let mut t = telemetry();
        t.record_score(2);
        t.record_score(7);
        t.record_score(10);
        assert_eq!(t.high_score_streak, 2);
        assert_eq!(t.low_score_streak, 0);
    }

    #[test]
    fn test_low_scores_reset_high_streak() {
        let mut t = telemetry();
        t.record_score(8);
        t.record_score(8);
        t.record_score(4);
        t.record_score(1);
        assert_eq!(t.low_score_streak, 2);
        assert_eq!(t.high_score_streak, 0);
    }

    #[test]
    fn test_middle_scores_reset_both_streaks() {
        let mut t = telemetry();
        t.record_score(3);
        t.record_score(5);
        assert_eq!(t.low_score_streak, 0);
        assert_eq!(t.high_score_streak, 0);

        t.record_score(9);
        t.record_score(6);
        assert_eq!(t.low_score_streak, 0);
        assert_eq!(t.high_score_streak, 0);
    }

    #[test]
    fn test_confidence_running_mean() {
        let mut t = telemetry();
        assert_eq!(t.avg_confidence, None);
        t.record_confidence(0.5);
        t.record_confidence(1.0);
        t.record_confidence(f64::NAN);
        t.record_confidence(0.0);
        assert_abs_diff_eq!(t.avg_confidence.unwrap(), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_first_question_is_only_marked_once() {
        let mut t = telemetry();
        let first = Utc::now();
        t.mark_first_question(first);
        t.mark_first_question(first + chrono::Duration::seconds(30));
        assert_eq!(t.first_question_at, Some(first));
    }
}
