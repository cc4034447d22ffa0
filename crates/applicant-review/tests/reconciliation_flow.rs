//! Multi-region consistency through the public API: mounted regions agree
//! after every mutation, and a degraded refresh never leaves a partial view.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use applicant_review::review::{
    AssessmentModel, BackendError, CandidateId, Criterion, CriterionOverride, OverrideController,
    OverrideReceipt, PresentationHost, RegionSnapshot, RegionType, ScoringBackend,
};

/// Backend whose fetch can be made to fail exactly once.
struct FlakyBackend {
    scores: Mutex<BTreeMap<Criterion, f32>>,
    overrides: Mutex<BTreeMap<Criterion, CriterionOverride>>,
    fail_next_fetch: Mutex<bool>,
    candidate: CandidateId,
}

impl FlakyBackend {
    fn new(candidate: CandidateId) -> Self {
        let scores = [
            (Criterion::Education, 24.0),
            (Criterion::Experience, 15.0),
            (Criterion::Training, 6.0),
            (Criterion::Eligibility, 8.0),
            (Criterion::Accomplishments, 2.0),
        ];
        Self {
            scores: Mutex::new(scores.into_iter().collect()),
            overrides: Mutex::new(BTreeMap::new()),
            fail_next_fetch: Mutex::new(false),
            candidate,
        }
    }

    fn fail_next_fetch(&self) {
        *self.fail_next_fetch.lock().expect("flag mutex poisoned") = true;
    }

    fn check(&self, candidate: &CandidateId) -> Result<(), BackendError> {
        if candidate == &self.candidate {
            Ok(())
        } else {
            Err(BackendError::NotFound(candidate.0.clone()))
        }
    }
}

impl ScoringBackend for FlakyBackend {
    fn get_assessment(&self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError> {
        self.check(candidate)?;
        let mut flag = self.fail_next_fetch.lock().expect("flag mutex poisoned");
        if *flag {
            *flag = false;
            return Err(BackendError::Transport("simulated outage".to_string()));
        }
        let scores = self.scores.lock().expect("scores mutex poisoned").clone();
        let overrides = self.overrides.lock().expect("overrides mutex poisoned").clone();
        let rule: f32 = Criterion::ALL
            .iter()
            .map(|criterion| {
                overrides
                    .get(criterion)
                    .map(|entry| entry.override_score)
                    .unwrap_or_else(|| scores.get(criterion).copied().unwrap_or(0.0))
            })
            .sum();
        Ok(AssessmentModel::from_parts(
            candidate.clone(),
            scores,
            overrides,
            0.0,
            (rule + 5.0).min(100.0),
        ))
    }

    fn put_override(
        &self,
        candidate: &CandidateId,
        criterion: Criterion,
        score: f32,
        reason: &str,
    ) -> Result<OverrideReceipt, BackendError> {
        self.check(candidate)?;
        let system_value = self
            .scores
            .lock()
            .expect("scores mutex poisoned")
            .get(&criterion)
            .copied()
            .unwrap_or(0.0);
        self.overrides.lock().expect("overrides mutex poisoned").insert(
            criterion,
            CriterionOverride {
                criterion,
                original_score: system_value,
                override_score: score,
                reason: reason.to_string(),
                created_at: chrono::Utc::now(),
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
        self.check(candidate)?;
        self.overrides
            .lock()
            .expect("overrides mutex poisoned")
            .remove(&criterion);
        Ok(OverrideReceipt {
            criterion,
            system_value: self
                .scores
                .lock()
                .expect("scores mutex poisoned")
                .get(&criterion)
                .copied()
                .unwrap_or(0.0),
        })
    }

    fn put_potential(&self, candidate: &CandidateId, _value: f32) -> Result<(), BackendError> {
        self.check(candidate)
    }

    fn list_overrides(
        &self,
        candidate: &CandidateId,
    ) -> Result<BTreeMap<Criterion, CriterionOverride>, BackendError> {
        self.check(candidate)?;
        Ok(self.overrides.lock().expect("overrides mutex poisoned").clone())
    }
}

#[derive(Default)]
struct CapturingHost {
    mounted: Mutex<Vec<(CandidateId, RegionType)>>,
    frames: Mutex<HashMap<(CandidateId, RegionType), RegionSnapshot>>,
}

impl CapturingHost {
    fn mount(&self, candidate: &CandidateId, region: RegionType) {
        self.mounted
            .lock()
            .expect("host mutex poisoned")
            .push((candidate.clone(), region));
    }

    fn frame(&self, candidate: &CandidateId, region: RegionType) -> Option<RegionSnapshot> {
        self.frames
            .lock()
            .expect("host mutex poisoned")
            .get(&(candidate.clone(), region))
            .cloned()
    }
}

impl PresentationHost for CapturingHost {
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
            .insert((candidate.clone(), region), snapshot);
    }
}

#[test]
fn all_mounted_regions_show_the_same_total_after_an_override() {
    let candidate = CandidateId("cand-555".to_string());
    let backend = Arc::new(FlakyBackend::new(candidate.clone()));
    let host = Arc::new(CapturingHost::default());
    for region in RegionType::ALL {
        host.mount(&candidate, region);
    }

    let mut controller = OverrideController::new(backend, host.clone());
    controller.open_candidate(&candidate).expect("opens");

    controller
        .begin_edit(&candidate, Criterion::Education)
        .expect("session opens");
    controller
        .save(&candidate, Criterion::Education, 33.0, "committee decision")
        .expect("override saves");

    let totals: Vec<f32> = RegionType::ALL
        .iter()
        .map(|region| {
            host.frame(&candidate, *region)
                .expect("region refreshed")
                .rule_based
                .value
        })
        .collect();
    assert!(totals.iter().all(|value| *value == totals[0]));
    assert_eq!(totals[0], 64.0);
}

#[test]
fn a_degraded_refresh_keeps_the_previous_consistent_frames() {
    let candidate = CandidateId("cand-556".to_string());
    let backend = Arc::new(FlakyBackend::new(candidate.clone()));
    let host = Arc::new(CapturingHost::default());
    host.mount(&candidate, RegionType::SummaryRow);
    host.mount(&candidate, RegionType::TotalsBanner);

    let mut controller = OverrideController::new(backend.clone(), host.clone());
    controller.open_candidate(&candidate).expect("opens");
    let before = host
        .frame(&candidate, RegionType::SummaryRow)
        .expect("baseline frame")
        .rule_based
        .value;

    controller
        .begin_edit(&candidate, Criterion::Education)
        .expect("session opens");
    backend.fail_next_fetch();
    let outcome = controller
        .save(&candidate, Criterion::Education, 33.0, "committee decision")
        .expect("write is durable even though the refresh fails");
    assert!(outcome.warning.is_some());

    for region in [RegionType::SummaryRow, RegionType::TotalsBanner] {
        assert_eq!(
            host.frame(&candidate, region)
                .expect("frame retained")
                .rule_based
                .value,
            before
        );
    }

    // The next successful refresh converges every region on the new total.
    controller.refresh(&candidate).expect("manual refresh");
    for region in [RegionType::SummaryRow, RegionType::TotalsBanner] {
        assert_eq!(
            host.frame(&candidate, region)
                .expect("frame refreshed")
                .rule_based
                .value,
            64.0
        );
    }
}
