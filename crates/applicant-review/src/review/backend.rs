use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::assessment::AssessmentModel;
use super::domain::{CandidateId, Criterion, CriterionOverride};

/// Write acknowledgment carrying the backend's current system value for the
/// touched criterion, so callers never fall back to a cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideReceipt {
    pub criterion: Criterion,
    pub system_value: f32,
}

/// Failures raised by the scoring backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Service-side rejection (range, missing justification). The message is
    /// surfaced to the reviewer verbatim.
    #[error("{0}")]
    Rejected(String),
    #[error("unknown candidate or criterion: {0}")]
    NotFound(String),
    /// Network or timeout failure; retryable, no state assumed changed.
    #[error("scoring backend unreachable: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

/// The external scoring service: computes system scores, stores overrides,
/// and returns the authoritative assessment on demand.
pub trait ScoringBackend: Send + Sync {
    /// Current system scores, active overrides, potential, and AI-enhanced
    /// total; must reflect any prior write.
    fn get_assessment(&self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError>;

    /// Upsert one criterion override.
    fn put_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
        score: f32,
        reason: &str,
    ) -> Result<OverrideReceipt, BackendError>;

    /// Idempotent: deleting a non-existent override confirms the current
    /// system value rather than erroring.
    fn delete_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<OverrideReceipt, BackendError>;

    /// Always an upsert; the potential score has no delete path.
    fn put_potential(&self, candidate: &CandidateId, value: f32) -> Result<(), BackendError>;

    /// Active overrides keyed by criterion, for pre-populating edit sessions
    /// and badges without opening a session.
    fn list_overrides(
        &self,
        candidate: &CandidateId,
    ) -> Result<BTreeMap<Criterion, CriterionOverride>, BackendError>;
}
