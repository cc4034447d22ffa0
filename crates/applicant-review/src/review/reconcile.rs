use std::sync::Arc;

use tracing::debug;

use super::assessment::AssessmentModel;
use super::backend::{BackendError, ScoringBackend};
use super::domain::CandidateId;
use super::presentation::{render_region, PresentationHost, RegionType};

/// Pushes an authoritative assessment into every mounted presentation region
/// for one candidate. Regions belonging to other candidates are never touched.
pub struct ReconciliationService<B, P> {
    backend: Arc<B>,
    host: Arc<P>,
}

impl<B, P> ReconciliationService<B, P>
where
    B: ScoringBackend,
    P: PresentationHost,
{
    pub fn new(backend: Arc<B>, host: Arc<P>) -> Self {
        Self { backend, host }
    }

    /// Re-fetch the authoritative model and fan it out. If the fetch fails,
    /// no region is written: stale-but-consistent beats partially updated.
    pub fn recalculate(&self, candidate: &CandidateId) -> Result<AssessmentModel, ReconcileError> {
        let model = self
            .backend
            .get_assessment(candidate)
            .map_err(|source| ReconcileError::Refresh {
                candidate: candidate.clone(),
                source,
            })?;
        self.apply(&model);
        Ok(model)
    }

    /// Region fan-out for an already-fetched model. Unmounted regions are
    /// skipped silently, so repeated calls with a subset of regions open are
    /// idempotent no-ops for the rest.
    pub fn apply(&self, model: &AssessmentModel) {
        for region in RegionType::ALL {
            if self.host.is_mounted(&model.candidate_id, region) {
                self.host
                    .write(&model.candidate_id, region, render_region(region, model));
            } else {
                debug!(
                    candidate = %model.candidate_id,
                    region = region.label(),
                    "region not mounted; skipping"
                );
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("refresh for candidate {candidate} failed: {source}")]
    Refresh {
        candidate: CandidateId,
        source: BackendError,
    },
}

/// Soft warning for a durable write whose follow-up refresh failed. The
/// regions keep their last-confirmed values; a manual refresh clears it.
#[derive(Debug, Clone)]
pub struct ReconcileWarning {
    pub candidate: CandidateId,
    pub detail: String,
}
