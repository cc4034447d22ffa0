use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::review::assessment::AssessmentModel;
use crate::review::backend::{BackendError, OverrideReceipt, ScoringBackend};
use crate::review::controller::OverrideController;
use crate::review::domain::{CandidateId, Criterion, CriterionOverride, POTENTIAL_MAX};
use crate::review::presentation::{PresentationHost, RegionSnapshot, RegionType};
use crate::review::reconcile::ReconciliationService;

pub(super) fn candidate() -> CandidateId {
    CandidateId("cand-042".to_string())
}

pub(super) fn other_candidate() -> CandidateId {
    CandidateId("cand-107".to_string())
}

/// Effective criterion values summing to 70 with potential 0, so the
/// override and potential walkthroughs land on round totals.
pub(super) const BASELINE: [(Criterion, f32); 5] = [
    (Criterion::Education, 28.0),
    (Criterion::Experience, 20.0),
    (Criterion::Training, 8.0),
    (Criterion::Eligibility, 10.0),
    (Criterion::Accomplishments, 4.0),
];

struct CandidateState {
    system: BTreeMap<Criterion, f32>,
    overrides: BTreeMap<Criterion, CriterionOverride>,
    potential: f32,
    ai_margin: f32,
}

/// Scripted stand-in for the scoring service, with failure knobs consumed by
/// the next matching call.
#[derive(Default)]
pub(super) struct MemoryScoringBackend {
    records: Mutex<HashMap<CandidateId, CandidateState>>,
    fail_fetch: Mutex<Option<BackendError>>,
    fail_write: Mutex<Option<BackendError>>,
    put_calls: AtomicU32,
    delete_calls: AtomicU32,
}

impl MemoryScoringBackend {
    pub(super) fn seed(
        &self,
        candidate: &CandidateId,
        system: &[(Criterion, f32)],
        ai_margin: f32,
    ) {
        let mut records = self.records.lock().expect("backend mutex poisoned");
        records.insert(
            candidate.clone(),
            CandidateState {
                system: system.iter().copied().collect(),
                overrides: BTreeMap::new(),
                potential: 0.0,
                ai_margin,
            },
        );
    }

    pub(super) fn queue_fetch_failure(&self, error: BackendError) {
        *self.fail_fetch.lock().expect("backend mutex poisoned") = Some(error);
    }

    pub(super) fn queue_write_failure(&self, error: BackendError) {
        *self.fail_write.lock().expect("backend mutex poisoned") = Some(error);
    }

    pub(super) fn put_calls(&self) -> u32 {
        self.put_calls.load(Ordering::Relaxed)
    }

    pub(super) fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::Relaxed)
    }

    pub(super) fn stored_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Option<CriterionOverride> {
        let records = self.records.lock().expect("backend mutex poisoned");
        records
            .get(candidate)
            .and_then(|state| state.overrides.get(&criterion).cloned())
    }

    fn take_write_failure(&self) -> Option<BackendError> {
        self.fail_write.lock().expect("backend mutex poisoned").take()
    }

    fn rule_total(state: &CandidateState) -> f32 {
        let criteria: f32 = Criterion::ALL
            .iter()
            .map(|criterion| {
                state
                    .overrides
                    .get(criterion)
                    .map(|entry| entry.override_score)
                    .unwrap_or_else(|| state.system.get(criterion).copied().unwrap_or(0.0))
            })
            .sum();
        criteria + state.potential
    }
}

impl ScoringBackend for MemoryScoringBackend {
    fn get_assessment(&self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError> {
        if let Some(error) = self.fail_fetch.lock().expect("backend mutex poisoned").take() {
            return Err(error);
        }
        let records = self.records.lock().expect("backend mutex poisoned");
        let state = records
            .get(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;

        // The AI-enhanced total tapers the semantic margin as the rule-based
        // total approaches the ceiling, like the production service does.
        let rule = Self::rule_total(state);
        let ai = (rule + state.ai_margin * (1.0 - rule / 100.0)).min(100.0);

        Ok(AssessmentModel::from_parts(
            candidate.clone(),
            state.system.clone(),
            state.overrides.clone(),
            state.potential,
            ai,
        ))
    }

    fn put_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
        score: f32,
        reason: &str,
    ) -> Result<OverrideReceipt, BackendError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = self.take_write_failure() {
            return Err(error);
        }

        let mut records = self.records.lock().expect("backend mutex poisoned");
        let state = records
            .get_mut(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        let max = criterion.max_points();
        if !(0.0..=max).contains(&score) {
            return Err(BackendError::Rejected(format!(
                "score {score} exceeds the {criterion} maximum of {max}"
            )));
        }
        if reason.trim().is_empty() {
            return Err(BackendError::Rejected(
                "an override requires a justification".to_string(),
            ));
        }

        let system_value = state.system.get(&criterion).copied().unwrap_or(0.0);
        state.overrides.insert(
            criterion,
            CriterionOverride {
                criterion,
                original_score: system_value,
                override_score: score,
                reason: reason.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(OverrideReceipt {
            criterion,
            system_value,
        })
    }

    fn delete_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<OverrideReceipt, BackendError> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(error) = self.take_write_failure() {
            return Err(error);
        }

        let mut records = self.records.lock().expect("backend mutex poisoned");
        let state = records
            .get_mut(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        state.overrides.remove(&criterion);
        Ok(OverrideReceipt {
            criterion,
            system_value: state.system.get(&criterion).copied().unwrap_or(0.0),
        })
    }

    fn put_potential(&self, candidate: &CandidateId, value: f32) -> Result<(), BackendError> {
        if let Some(error) = self.take_write_failure() {
            return Err(error);
        }
        let mut records = self.records.lock().expect("backend mutex poisoned");
        let state = records
            .get_mut(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        if !(0.0..=POTENTIAL_MAX).contains(&value) {
            return Err(BackendError::Rejected(format!(
                "potential {value} is outside 0..={POTENTIAL_MAX}"
            )));
        }
        state.potential = value;
        Ok(())
    }

    fn list_overrides(
        &self,
        candidate: &CandidateId,
    ) -> Result<BTreeMap<Criterion, CriterionOverride>, BackendError> {
        let records = self.records.lock().expect("backend mutex poisoned");
        let state = records
            .get(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        Ok(state.overrides.clone())
    }
}

/// Presentation double that records every frame written, in order.
#[derive(Default)]
pub(super) struct RecordingHost {
    mounted: Mutex<BTreeSet<(CandidateId, RegionType)>>,
    frames: Mutex<Vec<(CandidateId, RegionType, RegionSnapshot)>>,
}

impl RecordingHost {
    pub(super) fn mount(&self, candidate: &CandidateId, region: RegionType) {
        self.mounted
            .lock()
            .expect("host mutex poisoned")
            .insert((candidate.clone(), region));
    }

    pub(super) fn mount_all(&self, candidate: &CandidateId) {
        for region in RegionType::ALL {
            self.mount(candidate, region);
        }
    }

    pub(super) fn unmount(&self, candidate: &CandidateId, region: RegionType) {
        self.mounted
            .lock()
            .expect("host mutex poisoned")
            .remove(&(candidate.clone(), region));
    }

    pub(super) fn writes(&self) -> Vec<(CandidateId, RegionType, RegionSnapshot)> {
        self.frames.lock().expect("host mutex poisoned").clone()
    }

    pub(super) fn write_count(&self) -> usize {
        self.frames.lock().expect("host mutex poisoned").len()
    }

    pub(super) fn latest(
        &self,
        candidate: &CandidateId,
        region: RegionType,
    ) -> Option<RegionSnapshot> {
        self.frames
            .lock()
            .expect("host mutex poisoned")
            .iter()
            .rev()
            .find(|(id, kind, _)| id == candidate && *kind == region)
            .map(|(_, _, snapshot)| snapshot.clone())
    }
}

impl PresentationHost for RecordingHost {
    fn is_mounted(&self, candidate: &CandidateId, region: RegionType) -> bool {
        self.mounted
            .lock()
            .expect("host mutex poisoned")
            .contains(&(candidate.clone(), region))
    }

    fn write(&self, candidate: &CandidateId, region: RegionType, snapshot: RegionSnapshot) {
        self.frames
            .lock()
            .expect("host mutex poisoned")
            .push((candidate.clone(), region, snapshot));
    }
}

pub(super) fn harness() -> (
    OverrideController<MemoryScoringBackend, RecordingHost>,
    Arc<MemoryScoringBackend>,
    Arc<RecordingHost>,
) {
    let backend = Arc::new(MemoryScoringBackend::default());
    backend.seed(&candidate(), &BASELINE, 6.5);
    let host = Arc::new(RecordingHost::default());
    let controller = OverrideController::new(backend.clone(), host.clone());
    (controller, backend, host)
}

pub(super) fn reconciler(
    backend: Arc<MemoryScoringBackend>,
    host: Arc<RecordingHost>,
) -> ReconciliationService<MemoryScoringBackend, RecordingHost> {
    ReconciliationService::new(backend, host)
}
