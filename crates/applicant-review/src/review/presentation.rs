use serde::Serialize;

use super::assessment::AssessmentModel;
use super::classifier::TierBadge;
use super::domain::{CandidateId, Criterion, RULE_TOTAL_MAX};

/// Visual regions the console can have mounted for a candidate. `SummaryRow`
/// is the list-level row, refreshed alongside the detail regions so a closed
/// detail view and its row never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    CriterionBreakdown,
    ScoreChart,
    TotalsBanner,
    SummaryRow,
}

impl RegionType {
    pub const ALL: [RegionType; 4] = [
        RegionType::CriterionBreakdown,
        RegionType::ScoreChart,
        RegionType::TotalsBanner,
        RegionType::SummaryRow,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RegionType::CriterionBreakdown => "criterion breakdown",
            RegionType::ScoreChart => "score chart",
            RegionType::TotalsBanner => "totals banner",
            RegionType::SummaryRow => "summary row",
        }
    }
}

/// One rendered breakdown line: number, tier color, bar width, and the
/// override badge with its justification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionRow {
    pub criterion: Criterion,
    pub label: &'static str,
    pub effective_value: f32,
    pub max_points: f32,
    pub badge: TierBadge,
    pub overridden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalReading {
    pub value: f32,
    pub max_points: f32,
    pub badge: TierBadge,
}

impl TotalReading {
    fn out_of_hundred(value: f32) -> Self {
        Self {
            value,
            max_points: RULE_TOTAL_MAX,
            badge: TierBadge::classify(value, RULE_TOTAL_MAX),
        }
    }
}

/// Everything a region displays, rendered from one authoritative model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSnapshot {
    pub region: RegionType,
    pub candidate_id: CandidateId,
    pub rule_based: TotalReading,
    pub ai_enhanced: TotalReading,
    pub potential: f32,
    pub rows: Vec<CriterionRow>,
}

/// Deterministic render: the same model and region always produce the same
/// snapshot, which is what keeps repeated reconciliation idempotent.
pub fn render_region(region: RegionType, model: &AssessmentModel) -> RegionSnapshot {
    let rows = match region {
        RegionType::CriterionBreakdown | RegionType::ScoreChart => Criterion::ALL
            .into_iter()
            .map(|criterion| {
                let score = model.criterion(criterion);
                CriterionRow {
                    criterion,
                    label: criterion.label(),
                    effective_value: score.effective_value(),
                    max_points: criterion.max_points(),
                    badge: TierBadge::classify(score.effective_value(), criterion.max_points()),
                    overridden: score.is_overridden(),
                    override_reason: score.override_reason().map(str::to_string),
                }
            })
            .collect(),
        RegionType::TotalsBanner | RegionType::SummaryRow => Vec::new(),
    };

    RegionSnapshot {
        region,
        candidate_id: model.candidate_id.clone(),
        rule_based: TotalReading::out_of_hundred(model.rule_based_total()),
        ai_enhanced: TotalReading::out_of_hundred(model.ai_enhanced_total),
        potential: model.potential,
        rows,
    }
}

/// The host application owning the mounted visual regions. The core never
/// assumes a region exists; `write` must be a safe no-op for unmounted ones.
pub trait PresentationHost: Send + Sync {
    fn is_mounted(&self, candidate: &CandidateId, region: RegionType) -> bool;
    fn write(&self, candidate: &CandidateId, region: RegionType, snapshot: RegionSnapshot);
}
