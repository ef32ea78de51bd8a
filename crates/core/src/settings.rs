//! Stage runtime settings
//!
//! Immutable pacing and sufficiency limits for one interview. They are built
//! from a per-type preset or supplied explicitly, validated once when the
//! session starts, and never mutated afterwards.

use crate::coverage::Criterion;
use crate::error::{InterviewError, Result};
use crate::interview::{InterviewConfig, InterviewType};
use serde::{Deserialize, Serialize};

const MINUTE_MS: u64 = 60_000;

/// Longest stage a session may be configured for.
pub const MAX_STAGE_DURATION_MS: u64 = 24 * 60 * MINUTE_MS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyThresholds {
    pub overall: f64,
    pub critical: f64,
}

impl Default for SufficiencyThresholds {
    fn default() -> Self {
        Self {
            overall: 0.6,
            critical: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRuntimeSettings {
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
    #[serde(default)]
    pub target_duration_ms: Option<u64>,
    pub min_questions: u32,
    pub max_questions: u32,
    #[serde(default)]
    pub thresholds: SufficiencyThresholds,
    /// Ordered; earlier entries win when several gaps compete.
    pub critical_criteria: Vec<Criterion>,
}

impl StageRuntimeSettings {
    /// The built-in preset for an interview type.
    pub fn preset(interview_type: InterviewType) -> Self {
        let (min, max, target, min_q, max_q, critical) = match interview_type {
            InterviewType::HrScreen => (
                15,
                30,
                22,
                4,
                8,
                vec![
                    Criterion::Background,
                    Criterion::Motivation,
                    Criterion::Logistics,
                ],
            ),
            InterviewType::Technical => (
                35,
                55,
                45,
                5,
                10,
                vec![Criterion::Skills, Criterion::Behavioral],
            ),
            InterviewType::Final => (
                25,
                40,
                32,
                4,
                8,
                vec![
                    Criterion::CultureFit,
                    Criterion::Motivation,
                    Criterion::Behavioral,
                ],
            ),
        };
        Self {
            min_duration_ms: min * MINUTE_MS,
            max_duration_ms: max * MINUTE_MS,
            target_duration_ms: Some(target * MINUTE_MS),
            min_questions: min_q,
            max_questions: max_q,
            thresholds: SufficiencyThresholds::default(),
            critical_criteria: critical,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_questions < 1 {
            return Err(invalid("minQuestions must be at least 1"));
        }
        if self.max_questions < self.min_questions {
            return Err(invalid(format!(
                "maxQuestions ({}) must not be lower than minQuestions ({})",
                self.max_questions, self.min_questions
            )));
        }
        if self.min_duration_ms == 0 {
            return Err(invalid("minDurationMs must be positive"));
        }
        if self.max_duration_ms < self.min_duration_ms {
            return Err(invalid(format!(
                "maxDurationMs ({}) must not be lower than minDurationMs ({})",
                self.max_duration_ms, self.min_duration_ms
            )));
        }
        if self.max_duration_ms > MAX_STAGE_DURATION_MS {
            return Err(invalid(format!(
                "maxDurationMs ({}) must not exceed {}",
                self.max_duration_ms, MAX_STAGE_DURATION_MS
            )));
        }
        if let Some(target) = self.target_duration_ms {
            if target < self.min_duration_ms || target > self.max_duration_ms {
                return Err(invalid(
                    "targetDurationMs must lie between minDurationMs and maxDurationMs",
                ));
            }
        }
        for (name, value) in [
            ("overall", self.thresholds.overall),
            ("critical", self.thresholds.critical),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(format!(
                    "sufficiency threshold '{}' must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        for (i, criterion) in self.critical_criteria.iter().enumerate() {
            if self.critical_criteria[..i].contains(criterion) {
                return Err(invalid(format!(
                    "critical criterion '{}' is listed more than once",
                    criterion
                )));
            }
        }
        Ok(())
    }

    /// Resolves and validates the settings for a start request.
    ///
    /// Returns the settings together with the number of planned questions.
    pub fn resolve(config: &InterviewConfig) -> Result<(Self, u32)> {
        if config.target_role.trim().is_empty() {
            return Err(invalid("targetRole must not be empty"));
        }
        let settings = match &config.stage {
            Some(stage) => stage.clone(),
            None => {
                if config.total_questions < 1 {
                    return Err(invalid("totalQuestions must be at least 1"));
                }
                let mut preset = Self::preset(config.interview_type);
                preset.max_questions = config.total_questions;
                preset.min_questions = preset.min_questions.min(config.total_questions);
                preset
            }
        };
        settings.validate()?;
        let total = settings.max_questions;
        Ok((settings, total))
    }
}

fn invalid(message: impl Into<String>) -> InterviewError {
    InterviewError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::Difficulty;

    fn config(total: u32) -> InterviewConfig {
        InterviewConfig::new(InterviewType::Technical, "Backend Engineer", Difficulty::Medium, total)
    }

    #[test]
    fn test_oversized_max_duration_rejected() {
        let mut stage = StageRuntimeSettings::preset(InterviewType::Technical);
        stage.max_duration_ms = 1 << 62;
        stage.target_duration_ms = None;
        assert!(matches!(stage.validate(), Err(InterviewError::Validation(_))));

        let err = StageRuntimeSettings::resolve(&config(5).with_stage(stage.clone())).unwrap_err();
        assert!(err.to_string().contains("must not exceed"));

        stage.max_duration_ms = MAX_STAGE_DURATION_MS;
        stage.validate().unwrap();
    }

    #[test]
    fn test_presets_match_stage_minutes() {
        let hr = StageRuntimeSettings::preset(InterviewType::HrScreen);
        assert_eq!(hr.min_duration_ms, 15 * 60_000);
        assert_eq!(hr.max_duration_ms, 30 * 60_000);
        assert_eq!(hr.target_duration_ms, Some(22 * 60_000));

        let tech = StageRuntimeSettings::preset(InterviewType::Technical);
        assert_eq!(tech.min_duration_ms, 35 * 60_000);
        assert_eq!(tech.max_duration_ms, 55 * 60_000);
        assert_eq!(tech.target_duration_ms, Some(45 * 60_000));

        let fin = StageRuntimeSettings::preset(InterviewType::Final);
        assert_eq!(fin.min_duration_ms, 25 * 60_000);
        assert_eq!(fin.max_duration_ms, 40 * 60_000);
        assert_eq!(fin.target_duration_ms, Some(32 * 60_000));

        for p in [hr, tech, fin] {
            p.validate().expect("presets are valid");
        }
    }

    #[test]
    fn test_resolve_fixed_count_mode() {
        let (settings, total) = StageRuntimeSettings::resolve(&config(7)).unwrap();
        assert_eq!(total, 7);
        assert_eq!(settings.max_questions, 7);
        assert_eq!(settings.min_questions, 5);

        let (short, total) = StageRuntimeSettings::resolve(&config(2)).unwrap();
        assert_eq!(total, 2);
        assert_eq!(short.min_questions, 2);
        assert_eq!(short.max_questions, 2);
    }

    #[test]
    fn test_resolve_rejects_zero_questions() {
        let err = StageRuntimeSettings::resolve(&config(0)).unwrap_err();
        assert!(matches!(err, InterviewError::Validation(_)));
    }

    #[test]
    fn test_resolve_rejects_blank_role() {
        let mut cfg = config(5);
        cfg.target_role = "  ".into();
        assert!(matches!(
            StageRuntimeSettings::resolve(&cfg),
            Err(InterviewError::Validation(_))
        ));
    }

    #[test]
    fn test_coverage_mode_uses_explicit_bounds() {
        let mut stage = StageRuntimeSettings::preset(InterviewType::HrScreen);
        stage.min_questions = 3;
        stage.max_questions = 5;
        let cfg = config(0).with_stage(stage);
        let (settings, total) = StageRuntimeSettings::resolve(&cfg).unwrap();
        assert_eq!(total, 5);
        assert_eq!(settings.min_questions, 3);
    }

    #[test]
    fn test_validate_rejects_inverted_question_bounds() {
        let mut stage = StageRuntimeSettings::preset(InterviewType::Final);
        stage.min_questions = 6;
        stage.max_questions = 4;
        let err = stage.validate().unwrap_err();
        assert!(err.to_string().contains("maxQuestions"));
    }

    #[test]
    fn test_validate_rejects_bad_thresholds_and_durations() {
        let mut stage = StageRuntimeSettings::preset(InterviewType::Final);
        stage.thresholds.critical = 1.5;
        assert!(stage.validate().is_err());

        let mut stage = StageRuntimeSettings::preset(InterviewType::Final);
        stage.max_duration_ms = stage.min_duration_ms - 1;
        assert!(stage.validate().is_err());

        let mut stage = StageRuntimeSettings::preset(InterviewType::Final);
        stage.target_duration_ms = Some(1);
        assert!(stage.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_critical_criteria() {
        let mut stage = StageRuntimeSettings::preset(InterviewType::Technical);
        stage.critical_criteria.push(Criterion::Skills);
        let err = stage.validate().unwrap_err();
        assert!(err.to_string().contains("skills"));
    }
}
