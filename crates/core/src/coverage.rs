use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Critical criteria scoring below this are reported as gaps.
pub const GAP_THRESHOLD: f64 = 0.3;

/// One of the six fixed topics an interview is expected to cover.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Background,
    Skills,
    Behavioral,
    Motivation,
    CultureFit,
    Logistics,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Background,
        Criterion::Skills,
        Criterion::Behavioral,
        Criterion::Motivation,
        Criterion::CultureFit,
        Criterion::Logistics,
    ];

    /// Human-readable label used in transition messages and notices.
    pub fn label(self) -> &'static str {
        match self {
            Criterion::Background => "Background & Experience",
            Criterion::Skills => "Skills & Expertise",
            Criterion::Behavioral => "Behavioral Examples",
            Criterion::Motivation => "Motivation & Interest",
            Criterion::CultureFit => "Culture Fit",
            Criterion::Logistics => "Logistics & Availability",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Background => "background",
            Criterion::Skills => "skills",
            Criterion::Behavioral => "behavioral",
            Criterion::Motivation => "motivation",
            Criterion::CultureFit => "culture_fit",
            Criterion::Logistics => "logistics",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified share of one answer attributed to a criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CriterionContribution {
    pub criterion: Criterion,
    /// How much of the criterion this answer covered, from 0.0 to 1.0.
    pub score: f64,
    /// Optional short observation kept alongside the criterion.
    #[serde(default)]
    pub note: Option<String>,
}

/// Accumulated coverage for a single criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionCoverage {
    pub score: f64,
    pub notes: Vec<String>,
    pub questions_asked: u32,
}

/// Per-session coverage of all six criteria.
///
/// Every criterion is present from construction, so lookups never miss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTracker {
    criteria: BTreeMap<Criterion, CriterionCoverage>,
}

impl Default for CoverageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self {
            criteria: Criterion::ALL
                .into_iter()
                .map(|c| (c, CriterionCoverage::default()))
                .collect(),
        }
    }

    pub fn get(&self, criterion: Criterion) -> &CriterionCoverage {
        // Populated for every variant in `new`.
        &self.criteria[&criterion]
    }

    pub fn score(&self, criterion: Criterion) -> f64 {
        self.get(criterion).score
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, &CriterionCoverage)> {
        self.criteria.iter().map(|(c, cov)| (*c, cov))
    }

    /// Folds the classified contributions of one answer into the tracker.
    ///
    /// Scores accumulate and saturate at 1.0. A criterion only counts the
    /// question as asked when the contribution is positive.
    pub fn apply(&mut self, contributions: &[CriterionContribution]) {
        for contribution in contributions {
            let share = if contribution.score.is_finite() {
                contribution.score.clamp(0.0, 1.0)
            } else {
                0.0
            };
            let entry = self.criteria.entry(contribution.criterion).or_default();
            if share > 0.0 {
                entry.score = (entry.score + share).min(1.0);
                entry.questions_asked += 1;
            }
            if let Some(note) = contribution.note.as_ref().filter(|n| !n.trim().is_empty()) {
                entry.notes.push(note.trim().to_string());
            }
        }
    }

    /// Unweighted mean of all six criterion scores.
    pub fn overall(&self) -> f64 {
        let total: f64 = self.criteria.values().map(|c| c.score).sum();
        total / self.criteria.len() as f64
    }

    /// Mean restricted to `critical`. An empty list is vacuously covered.
    pub fn critical(&self, critical: &[Criterion]) -> f64 {
        if critical.is_empty() {
            return 1.0;
        }
        let total: f64 = critical.iter().map(|c| self.score(*c)).sum();
        total / critical.len() as f64
    }

    /// Critical criteria below [`GAP_THRESHOLD`], in their declared order.
    pub fn gaps(&self, critical: &[Criterion]) -> Vec<Criterion> {
        critical
            .iter()
            .copied()
            .filter(|c| self.score(*c) < GAP_THRESHOLD)
            .collect()
    }

    pub fn summarize(&self, critical: &[Criterion]) -> CoverageSummary {
        CoverageSummary {
            overall: self.overall(),
            critical: self.critical(critical),
            gaps: self.gaps(critical),
        }
    }
}

/// Coverage rollup consulted by the completion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub overall: f64,
    pub critical: f64,
    pub gaps: Vec<Criterion>,
}
