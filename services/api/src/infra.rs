use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use applicant_review::review::{
    AssessmentModel, AssessmentPayload, BackendError, CandidateId, Criterion, CriterionOverride,
    OverrideReceipt, PresentationHost, RegionSnapshot, RegionType, ScoringBackend, POTENTIAL_MAX,
};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

struct CandidateRecord {
    system: BTreeMap<Criterion, f32>,
    overrides: BTreeMap<Criterion, CriterionOverride>,
    potential: f32,
    semantic_margin: f32,
}

impl CandidateRecord {
    fn rule_total(&self) -> f32 {
        let criteria: f32 = Criterion::ALL
            .iter()
            .map(|criterion| {
                self.overrides
                    .get(criterion)
                    .map(|entry| entry.override_score)
                    .unwrap_or_else(|| self.system.get(criterion).copied().unwrap_or(0.0))
            })
            .sum();
        criteria + self.potential
    }

    /// Semantic uplift shrinks as the rule-based total approaches the
    /// ceiling; clients treat the result as opaque.
    fn ai_enhanced_total(&self) -> f32 {
        let rule = self.rule_total();
        (rule + self.semantic_margin * (1.0 - rule / 100.0)).min(100.0)
    }
}

/// In-memory stand-in for the scoring engine. It emits the engine's
/// loosely-typed payload shape on reads, so the normalization boundary in the
/// core runs on the production path too.
#[derive(Default)]
pub(crate) struct InMemoryScoringBackend {
    records: Mutex<HashMap<CandidateId, CandidateRecord>>,
}

impl InMemoryScoringBackend {
    pub(crate) fn seed(
        &self,
        candidate_id: &str,
        system: [(Criterion, f32); 5],
        potential: f32,
        semantic_margin: f32,
    ) {
        let mut records = self.records.lock().expect("backend mutex poisoned");
        records.insert(
            CandidateId(candidate_id.to_string()),
            CandidateRecord {
                system: system.into_iter().collect(),
                overrides: BTreeMap::new(),
                potential,
                semantic_margin,
            },
        );
    }
}

impl ScoringBackend for InMemoryScoringBackend {
    fn get_assessment(&self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError> {
        let records = self.records.lock().expect("backend mutex poisoned");
        let record = records
            .get(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;

        let scores: Vec<Value> = record
            .system
            .iter()
            .map(|(criterion, value)| {
                let mut entry = json!({ "criterion": criterion, "auto_score": value });
                if let Some(active) = record.overrides.get(criterion) {
                    entry["manual_override"] = json!({
                        "value": active.override_score,
                        "previous_score": active.original_score,
                        "justification": active.reason,
                        "created_at": active.created_at,
                    });
                }
                entry
            })
            .collect();
        let payload = json!({
            "applicant_id": candidate.0,
            "scores": scores,
            "manual_potential": record.potential,
            "semantic_total": record.ai_enhanced_total(),
        });

        let payload: AssessmentPayload = serde_json::from_value(payload)
            .map_err(|err| BackendError::Transport(format!("malformed scoring payload: {err}")))?;
        Ok(AssessmentModel::from_payload(payload))
    }

    fn put_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
        score: f32,
        reason: &str,
    ) -> Result<OverrideReceipt, BackendError> {
        let mut records = self.records.lock().expect("backend mutex poisoned");
        let record = records
            .get_mut(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        let max = criterion.max_points();
        if !(0.0..=max).contains(&score) {
            return Err(BackendError::Rejected(format!(
                "{criterion} override {score} is outside 0..={max}"
            )));
        }
        if reason.trim().is_empty() {
            return Err(BackendError::Rejected(
                "an override requires a justification".to_string(),
            ));
        }

        let system_value = record.system.get(&criterion).copied().unwrap_or(0.0);
        record.overrides.insert(
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
        let mut records = self.records.lock().expect("backend mutex poisoned");
        let record = records
            .get_mut(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        record.overrides.remove(&criterion);
        Ok(OverrideReceipt {
            criterion,
            system_value: record.system.get(&criterion).copied().unwrap_or(0.0),
        })
    }

    fn put_potential(&self, candidate: &CandidateId, value: f32) -> Result<(), BackendError> {
        let mut records = self.records.lock().expect("backend mutex poisoned");
        let record = records
            .get_mut(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        if !(0.0..=POTENTIAL_MAX).contains(&value) {
            return Err(BackendError::Rejected(format!(
                "potential {value} is outside 0..={POTENTIAL_MAX}"
            )));
        }
        record.potential = value;
        Ok(())
    }

    fn list_overrides(
        &self,
        candidate: &CandidateId,
    ) -> Result<BTreeMap<Criterion, CriterionOverride>, BackendError> {
        let records = self.records.lock().expect("backend mutex poisoned");
        let record = records
            .get(candidate)
            .ok_or_else(|| BackendError::NotFound(candidate.0.clone()))?;
        Ok(record.overrides.clone())
    }
}

/// Region store standing in for the browser layer: remembers what is mounted
/// and keeps the latest frame per region.
#[derive(Default)]
pub(crate) struct InMemoryPresentationHost {
    mounted: Mutex<BTreeSet<(CandidateId, RegionType)>>,
    frames: Mutex<BTreeMap<(CandidateId, RegionType), RegionSnapshot>>,
}

impl InMemoryPresentationHost {
    pub(crate) fn mount(&self, candidate: &CandidateId, region: RegionType) {
        self.mounted
            .lock()
            .expect("host mutex poisoned")
            .insert((candidate.clone(), region));
    }

    pub(crate) fn frame(
        &self,
        candidate: &CandidateId,
        region: RegionType,
    ) -> Option<RegionSnapshot> {
        self.frames
            .lock()
            .expect("host mutex poisoned")
            .get(&(candidate.clone(), region))
            .cloned()
    }
}

impl PresentationHost for InMemoryPresentationHost {
    fn is_mounted(&self, candidate: &CandidateId, region: RegionType) -> bool {
        self.mounted
            .lock()
            .expect("host mutex poisoned")
            .contains(&(candidate.clone(), region))
    }

    fn write(&self, candidate: &CandidateId, region: RegionType, snapshot: RegionSnapshot) {
        let mounted = self.is_mounted(candidate, region);
        if !mounted {
            // Safe no-op for regions the console no longer shows.
            return;
        }
        self.frames
            .lock()
            .expect("host mutex poisoned")
            .insert((candidate.clone(), region), snapshot);
    }
}

/// Demo roster shared by `serve`, `scorecard`, and `demo`.
pub(crate) fn seed_candidates(backend: &InMemoryScoringBackend) -> usize {
    backend.seed(
        "cand-001",
        [
            (Criterion::Education, 28.0),
            (Criterion::Experience, 14.0),
            (Criterion::Training, 6.0),
            (Criterion::Eligibility, 8.0),
            (Criterion::Accomplishments, 4.0),
        ],
        10.0,
        5.0,
    );
    backend.seed(
        "cand-002",
        [
            (Criterion::Education, 18.0),
            (Criterion::Experience, 11.0),
            (Criterion::Training, 4.0),
            (Criterion::Eligibility, 7.0),
            (Criterion::Accomplishments, 2.0),
        ],
        6.0,
        3.5,
    );
    backend.seed(
        "cand-003",
        [
            (Criterion::Education, 34.0),
            (Criterion::Experience, 17.0),
            (Criterion::Training, 9.0),
            (Criterion::Eligibility, 9.0),
            (Criterion::Accomplishments, 5.0),
        ],
        12.0,
        2.0,
    );
    3
}
