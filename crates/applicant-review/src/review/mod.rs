//! Candidate review core: rubric data model, override edit lifecycle, and
//! presentation reconciliation.
//!
//! The flow is reviewer action -> [`controller::OverrideController`]
//! validates and calls the [`backend::ScoringBackend`] -> on success the
//! authoritative [`assessment::AssessmentModel`] is refetched and
//! [`reconcile::ReconciliationService`] pushes it into whatever regions the
//! [`presentation::PresentationHost`] currently has mounted.

pub mod assessment;
pub mod backend;
pub mod classifier;
pub mod controller;
pub mod domain;
pub mod presentation;
pub mod reconcile;
pub mod router;

#[cfg(test)]
mod tests;

pub use assessment::{AssessmentModel, AssessmentPayload, AssessmentView, CriterionView};
pub use backend::{BackendError, OverrideReceipt, ScoringBackend};
pub use classifier::{AchievementTier, TierBadge};
pub use controller::{
    EditSession, MutationOutcome, OverrideController, OverrideError, ResetPrompt, SessionState,
    ValidationError,
};
pub use domain::{
    CandidateId, Criterion, CriterionOverride, CriterionScore, POTENTIAL_MAX, RULE_TOTAL_MAX,
};
pub use presentation::{
    render_region, CriterionRow, PresentationHost, RegionSnapshot, RegionType, TotalReading,
};
pub use reconcile::{ReconcileError, ReconcileWarning, ReconciliationService};
pub use router::{review_router, ReviewState};
