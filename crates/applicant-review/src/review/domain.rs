use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for candidates under review.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximum value for the standalone administrative potential score.
pub const POTENTIAL_MAX: f32 = 15.0;

/// Ceiling of the rule-based total: criterion maxima plus potential.
pub const RULE_TOTAL_MAX: f32 = 100.0;

/// One scored rubric dimension. Weights are fixed and, together with the
/// potential score, sum to 100.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Education,
    Experience,
    Training,
    Eligibility,
    Accomplishments,
}

impl Criterion {
    /// Rubric order, used everywhere a complete breakdown renders.
    pub const ALL: [Criterion; 5] = [
        Criterion::Education,
        Criterion::Experience,
        Criterion::Training,
        Criterion::Eligibility,
        Criterion::Accomplishments,
    ];

    pub const fn max_points(self) -> f32 {
        match self {
            Criterion::Education => 40.0,
            Criterion::Experience => 20.0,
            Criterion::Training => 10.0,
            Criterion::Eligibility => 10.0,
            Criterion::Accomplishments => 5.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Criterion::Education => "Education",
            Criterion::Experience => "Experience",
            Criterion::Training => "Training",
            Criterion::Eligibility => "Eligibility",
            Criterion::Accomplishments => "Accomplishments",
        }
    }

    /// Wire key, matching the serde spelling.
    pub const fn key(self) -> &'static str {
        match self {
            Criterion::Education => "education",
            Criterion::Experience => "experience",
            Criterion::Training => "training",
            Criterion::Eligibility => "eligibility",
            Criterion::Accomplishments => "accomplishments",
        }
    }

    pub fn from_key(key: &str) -> Option<Criterion> {
        Criterion::ALL
            .into_iter()
            .find(|criterion| criterion.key() == key)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A reviewer-supplied replacement for a criterion's system score, with
/// mandatory justification. At most one exists per (candidate, criterion);
/// saving again replaces it, deleting removes it entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionOverride {
    pub criterion: Criterion,
    pub original_score: f32,
    pub override_score: f32,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// System score for one criterion plus the active override, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionScore {
    pub criterion: Criterion,
    pub system_value: f32,
    pub manual_override: Option<CriterionOverride>,
}

impl CriterionScore {
    pub fn system(criterion: Criterion, system_value: f32) -> Self {
        Self {
            criterion,
            system_value,
            manual_override: None,
        }
    }

    /// The score counted toward totals: override if present, else system.
    pub fn effective_value(&self) -> f32 {
        self.manual_override
            .as_ref()
            .map(|entry| entry.override_score)
            .unwrap_or(self.system_value)
    }

    pub fn is_overridden(&self) -> bool {
        self.manual_override.is_some()
    }

    pub fn override_reason(&self) -> Option<&str> {
        self.manual_override
            .as_ref()
            .map(|entry| entry.reason.as_str())
    }
}
