use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::classifier::TierBadge;
use super::domain::{
    CandidateId, Criterion, CriterionOverride, CriterionScore, POTENTIAL_MAX, RULE_TOTAL_MAX,
};

/// Loosely-typed assessment payload as the scoring backend emits it.
///
/// Historical deployments spelled the same concepts several ways; the aliases
/// absorb them here, once, so the rest of the crate only ever sees the strict
/// [`AssessmentModel`].
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentPayload {
    #[serde(alias = "candidateId", alias = "applicant_id")]
    pub candidate_id: String,
    #[serde(default, alias = "criterion_scores", alias = "scores")]
    pub criteria: Vec<CriterionPayload>,
    #[serde(default, alias = "potential_score", alias = "manual_potential")]
    pub potential: Option<f32>,
    #[serde(
        default,
        alias = "semantic_total",
        alias = "ai_total",
        alias = "aiEnhancedTotal"
    )]
    pub ai_enhanced_total: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CriterionPayload {
    pub criterion: Criterion,
    #[serde(
        default,
        alias = "auto_score",
        alias = "system_score",
        alias = "systemScore"
    )]
    pub system_value: Option<f32>,
    #[serde(default, rename = "override", alias = "manual_override")]
    pub override_entry: Option<OverridePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverridePayload {
    #[serde(default, alias = "score", alias = "value")]
    pub override_score: Option<f32>,
    #[serde(default, alias = "original", alias = "previous_score")]
    pub original_score: Option<f32>,
    #[serde(default, alias = "justification", alias = "note")]
    pub reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// In-memory rubric for one candidate, built only from backend data and
/// refetched after every successful mutation. The rule-based total is derived
/// here; the AI-enhanced total is backend-supplied and opaque.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssessmentModel {
    pub candidate_id: CandidateId,
    criteria: BTreeMap<Criterion, CriterionScore>,
    pub potential: f32,
    pub ai_enhanced_total: f32,
}

impl AssessmentModel {
    /// Normalize a backend payload into the strict model. Rubric completeness
    /// and ranges are the backend's responsibility: gaps default to zero and
    /// out-of-range values are clamped, each with a warning, never an error.
    pub fn from_payload(payload: AssessmentPayload) -> Self {
        let candidate_id = CandidateId(payload.candidate_id);
        let mut criteria = BTreeMap::new();

        for criterion in Criterion::ALL {
            let entry = payload
                .criteria
                .iter()
                .find(|entry| entry.criterion == criterion);

            let system_value = match entry.and_then(|entry| entry.system_value) {
                Some(value) => clamp_score(&candidate_id, criterion, value, "system score"),
                None => {
                    warn!(
                        candidate = %candidate_id,
                        criterion = %criterion,
                        "criterion missing from scoring payload; defaulting system score to 0"
                    );
                    0.0
                }
            };

            let manual_override = entry
                .and_then(|entry| entry.override_entry.clone())
                .and_then(|raw| normalize_override(&candidate_id, criterion, system_value, raw));

            criteria.insert(
                criterion,
                CriterionScore {
                    criterion,
                    system_value,
                    manual_override,
                },
            );
        }

        let potential = match payload.potential {
            Some(value) if (0.0..=POTENTIAL_MAX).contains(&value) => value,
            Some(value) => {
                warn!(
                    candidate = %candidate_id,
                    value,
                    "potential score outside 0..={POTENTIAL_MAX}; clamping"
                );
                value.clamp(0.0, POTENTIAL_MAX)
            }
            None => 0.0,
        };

        let mut model = Self {
            candidate_id,
            criteria,
            potential,
            ai_enhanced_total: 0.0,
        };
        model.ai_enhanced_total = match payload.ai_enhanced_total {
            Some(value) => value,
            None => {
                // Boundary default only: a present backend value is never
                // recomputed on this side.
                let fallback = model.rule_based_total();
                warn!(
                    candidate = %model.candidate_id,
                    fallback,
                    "payload omitted the AI-enhanced total; displaying the rule-based total"
                );
                fallback
            }
        };
        model
    }

    /// Constructor for backends that already hold structured data.
    pub fn from_parts(
        candidate_id: CandidateId,
        system: BTreeMap<Criterion, f32>,
        overrides: BTreeMap<Criterion, CriterionOverride>,
        potential: f32,
        ai_enhanced_total: f32,
    ) -> Self {
        let mut criteria = BTreeMap::new();
        for criterion in Criterion::ALL {
            criteria.insert(
                criterion,
                CriterionScore {
                    criterion,
                    system_value: system.get(&criterion).copied().unwrap_or(0.0),
                    manual_override: overrides.get(&criterion).cloned(),
                },
            );
        }
        Self {
            candidate_id,
            criteria,
            potential,
            ai_enhanced_total,
        }
    }

    pub fn criterion(&self, criterion: Criterion) -> &CriterionScore {
        self.criteria
            .get(&criterion)
            .expect("model is always built with the complete rubric")
    }

    pub fn criteria(&self) -> impl Iterator<Item = &CriterionScore> {
        self.criteria.values()
    }

    pub fn effective_value(&self, criterion: Criterion) -> f32 {
        self.criterion(criterion).effective_value()
    }

    pub fn is_overridden(&self, criterion: Criterion) -> bool {
        self.criterion(criterion).is_overridden()
    }

    pub fn override_reason(&self, criterion: Criterion) -> Option<&str> {
        self.criterion(criterion).override_reason()
    }

    /// Σ effective criterion values + potential, always within [0, 100].
    pub fn rule_based_total(&self) -> f32 {
        let criteria: f32 = self
            .criteria
            .values()
            .map(CriterionScore::effective_value)
            .sum();
        (criteria + self.potential).clamp(0.0, RULE_TOTAL_MAX)
    }

    /// Authoritative post-delete update: the backend returned the system
    /// value, so the cached copy drops the override without a refetch.
    pub(crate) fn restore_system_value(&mut self, criterion: Criterion, system_value: f32) {
        if let Some(score) = self.criteria.get_mut(&criterion) {
            score.system_value = system_value;
            score.manual_override = None;
        }
    }

    pub(crate) fn set_potential(&mut self, value: f32) {
        self.potential = value;
    }

    /// Serializable summary for HTTP responses.
    pub fn view(&self) -> AssessmentView {
        AssessmentView {
            candidate_id: self.candidate_id.clone(),
            rule_based_total: self.rule_based_total(),
            ai_enhanced_total: self.ai_enhanced_total,
            potential: self.potential,
            criteria: Criterion::ALL
                .into_iter()
                .map(|criterion| {
                    let score = self.criterion(criterion);
                    CriterionView {
                        criterion,
                        label: criterion.label(),
                        system_value: score.system_value,
                        effective_value: score.effective_value(),
                        max_points: criterion.max_points(),
                        overridden: score.is_overridden(),
                        override_reason: score.override_reason().map(str::to_string),
                        badge: TierBadge::classify(score.effective_value(), criterion.max_points()),
                    }
                })
                .collect(),
        }
    }
}

fn clamp_score(candidate: &CandidateId, criterion: Criterion, value: f32, kind: &str) -> f32 {
    let max = criterion.max_points();
    if (0.0..=max).contains(&value) {
        return value;
    }
    warn!(
        candidate = %candidate,
        criterion = %criterion,
        value,
        max,
        "{kind} outside criterion range; clamping"
    );
    value.clamp(0.0, max)
}

fn normalize_override(
    candidate: &CandidateId,
    criterion: Criterion,
    system_value: f32,
    raw: OverridePayload,
) -> Option<CriterionOverride> {
    let Some(score) = raw.override_score else {
        warn!(
            candidate = %candidate,
            criterion = %criterion,
            "override entry without a score; ignoring it"
        );
        return None;
    };
    let reason = raw.reason.unwrap_or_default();
    if reason.trim().is_empty() {
        warn!(
            candidate = %candidate,
            criterion = %criterion,
            "override entry without a justification; ignoring it"
        );
        return None;
    }

    Some(CriterionOverride {
        criterion,
        original_score: raw.original_score.unwrap_or(system_value),
        override_score: clamp_score(candidate, criterion, score, "override score"),
        reason,
        created_at: raw.created_at.unwrap_or_else(Utc::now),
    })
}

/// Sanitized representation of an assessment for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentView {
    pub candidate_id: CandidateId,
    pub rule_based_total: f32,
    pub ai_enhanced_total: f32,
    pub potential: f32,
    pub criteria: Vec<CriterionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriterionView {
    pub criterion: Criterion,
    pub label: &'static str,
    pub system_value: f32,
    pub effective_value: f32,
    pub max_points: f32,
    pub overridden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    pub badge: TierBadge,
}
