use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::warn;

use super::assessment::AssessmentModel;
use super::backend::{BackendError, ScoringBackend};
use super::domain::{CandidateId, Criterion, CriterionOverride, POTENTIAL_MAX};
use super::presentation::PresentationHost;
use super::reconcile::{ReconcileWarning, ReconciliationService};

/// Client-detectable input problems, rejected before any backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("score {value} is outside 0..={max} for {criterion}")]
    ScoreOutOfRange {
        criterion: Criterion,
        value: f32,
        max: f32,
    },
    #[error("an override requires a non-empty justification")]
    EmptyReason,
    #[error("potential score {value} is outside 0..={max}")]
    PotentialOutOfRange { value: f32, max: f32 },
}

#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("an edit session is already open for {criterion} on candidate {candidate}")]
    SessionAlreadyOpen {
        candidate: CandidateId,
        criterion: Criterion,
    },
    #[error("no edit session is open for {criterion} on candidate {candidate}")]
    NoSession {
        candidate: CandidateId,
        criterion: Criterion,
    },
    #[error("a submission is already in flight for {criterion} on candidate {candidate}")]
    SubmissionInFlight {
        candidate: CandidateId,
        criterion: Criterion,
    },
}

/// Per-(candidate, criterion) session key; there is deliberately no global
/// "currently editing" field anywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionKey {
    pub candidate: CandidateId,
    pub criterion: Criterion,
}

impl SessionKey {
    fn new(candidate: &CandidateId, criterion: Criterion) -> Self {
        Self {
            candidate: candidate.clone(),
            criterion,
        }
    }
}

/// Lifecycle of one open session. `Submitting` models the issuing control
/// disabling itself: at most one outstanding call per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Submitting,
    ConfirmingReset,
}

#[derive(Debug, Clone)]
pub struct EditSession {
    pub candidate: CandidateId,
    pub criterion: Criterion,
    pub draft_value: f32,
    pub draft_reason: String,
    pub prior_override: Option<CriterionOverride>,
    pub state: SessionState,
    pub last_error: Option<String>,
}

/// Result of a mutation: the write is durable; `refreshed` is absent only
/// when the follow-up reconciliation degraded to a warning.
#[derive(Debug)]
pub struct MutationOutcome {
    pub candidate: CandidateId,
    pub refreshed: Option<AssessmentModel>,
    pub warning: Option<ReconcileWarning>,
}

/// Confirmation prompt data for the destructive reset flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetPrompt {
    pub candidate: CandidateId,
    pub criterion: Criterion,
    pub effective_value: f32,
    pub overridden: bool,
}

/// Owns the override edit lifecycle and the last-confirmed assessment per
/// candidate. Sessions for different criteria and candidates are independent;
/// there is no global lock.
pub struct OverrideController<B, P> {
    backend: Arc<B>,
    reconciler: ReconciliationService<B, P>,
    sessions: BTreeMap<SessionKey, EditSession>,
    confirmed: HashMap<CandidateId, AssessmentModel>,
}

impl<B, P> OverrideController<B, P>
where
    B: ScoringBackend,
    P: PresentationHost,
{
    pub fn new(backend: Arc<B>, host: Arc<P>) -> Self {
        let reconciler = ReconciliationService::new(Arc::clone(&backend), host);
        Self {
            backend,
            reconciler,
            sessions: BTreeMap::new(),
            confirmed: HashMap::new(),
        }
    }

    /// Fresh fetch on detail-view open: primes the last-confirmed cache and
    /// pushes the model into whatever regions are mounted.
    pub fn open_candidate(&mut self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError> {
        let model = self.backend.get_assessment(candidate)?;
        self.reconciler.apply(&model);
        self.confirmed.insert(candidate.clone(), model.clone());
        Ok(model)
    }

    /// Manual refresh escape hatch after a degraded reconciliation.
    pub fn refresh(&mut self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError> {
        self.open_candidate(candidate)
    }

    /// Open an edit session, pre-filled with the effective value and the
    /// prior override's justification if one is active. No write happens.
    pub fn begin_edit(
        &mut self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<&EditSession, OverrideError> {
        let key = SessionKey::new(candidate, criterion);
        if self.sessions.contains_key(&key) {
            return Err(OverrideError::SessionAlreadyOpen {
                candidate: candidate.clone(),
                criterion,
            });
        }

        let model = self.confirmed_or_fetch(candidate)?;
        let score = model.criterion(criterion);
        let prior_override = score.manual_override.clone();
        let session = EditSession {
            candidate: candidate.clone(),
            criterion,
            draft_value: score.effective_value(),
            draft_reason: prior_override
                .as_ref()
                .map(|entry| entry.reason.clone())
                .unwrap_or_default(),
            prior_override,
            state: SessionState::Editing,
            last_error: None,
        };

        Ok(self.sessions.entry(key).or_insert(session))
    }

    pub fn cancel_edit(
        &mut self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<(), OverrideError> {
        let key = SessionKey::new(candidate, criterion);
        match self.sessions.get(&key).map(|session| session.state) {
            Some(SessionState::Editing) => {
                self.sessions.remove(&key);
                Ok(())
            }
            Some(SessionState::Submitting) => Err(OverrideError::SubmissionInFlight {
                candidate: candidate.clone(),
                criterion,
            }),
            Some(SessionState::ConfirmingReset) | None => Err(OverrideError::NoSession {
                candidate: candidate.clone(),
                criterion,
            }),
        }
    }

    /// Validate locally, then submit the override as an upsert. A rejected
    /// submission leaves the session in Editing with the reviewer's input and
    /// the backend message intact.
    pub fn save(
        &mut self,
        candidate: &CandidateId,
        criterion: Criterion,
        value: f32,
        reason: &str,
    ) -> Result<MutationOutcome, OverrideError> {
        let key = SessionKey::new(candidate, criterion);
        {
            let session = self
                .sessions
                .get_mut(&key)
                .ok_or_else(|| OverrideError::NoSession {
                    candidate: candidate.clone(),
                    criterion,
                })?;
            match session.state {
                SessionState::Editing => {}
                SessionState::Submitting => {
                    return Err(OverrideError::SubmissionInFlight {
                        candidate: candidate.clone(),
                        criterion,
                    })
                }
                SessionState::ConfirmingReset => {
                    return Err(OverrideError::NoSession {
                        candidate: candidate.clone(),
                        criterion,
                    })
                }
            }

            session.draft_value = value;
            session.draft_reason = reason.to_string();

            if let Err(err) = validate_override(criterion, value, reason) {
                session.last_error = Some(err.to_string());
                return Err(err.into());
            }

            session.state = SessionState::Submitting;
            session.last_error = None;
        }

        match self
            .backend
            .put_override(candidate, criterion, value, reason.trim())
        {
            Ok(_receipt) => {
                self.sessions.remove(&key);
                Ok(self.finish_mutation(candidate))
            }
            Err(err) => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.state = SessionState::Editing;
                    session.last_error = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }

    /// First half of the destructive reset flow: captures what the reviewer
    /// is about to discard. Resetting a criterion with no active override is
    /// allowed — the delete is idempotent on the backend.
    pub fn request_reset(
        &mut self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<ResetPrompt, OverrideError> {
        let key = SessionKey::new(candidate, criterion);
        if self.sessions.contains_key(&key) {
            return Err(OverrideError::SessionAlreadyOpen {
                candidate: candidate.clone(),
                criterion,
            });
        }

        let model = self.confirmed_or_fetch(candidate)?;
        let score = model.criterion(criterion);
        let prompt = ResetPrompt {
            candidate: candidate.clone(),
            criterion,
            effective_value: score.effective_value(),
            overridden: score.is_overridden(),
        };

        self.sessions.insert(
            key,
            EditSession {
                candidate: candidate.clone(),
                criterion,
                draft_value: prompt.effective_value,
                draft_reason: String::new(),
                prior_override: score.manual_override.clone(),
                state: SessionState::ConfirmingReset,
                last_error: None,
            },
        );

        Ok(prompt)
    }

    pub fn cancel_reset(
        &mut self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<(), OverrideError> {
        let key = SessionKey::new(candidate, criterion);
        match self.sessions.get(&key).map(|session| session.state) {
            Some(SessionState::ConfirmingReset) => {
                self.sessions.remove(&key);
                Ok(())
            }
            _ => Err(OverrideError::NoSession {
                candidate: candidate.clone(),
                criterion,
            }),
        }
    }

    /// Second half of the reset flow: issues the delete and restores the
    /// system value the backend returns — never a cached one.
    pub fn confirm_reset(
        &mut self,
        candidate: &CandidateId,
        criterion: Criterion,
    ) -> Result<MutationOutcome, OverrideError> {
        let key = SessionKey::new(candidate, criterion);
        {
            let session = self
                .sessions
                .get_mut(&key)
                .ok_or_else(|| OverrideError::NoSession {
                    candidate: candidate.clone(),
                    criterion,
                })?;
            match session.state {
                SessionState::ConfirmingReset => {}
                SessionState::Submitting => {
                    return Err(OverrideError::SubmissionInFlight {
                        candidate: candidate.clone(),
                        criterion,
                    })
                }
                SessionState::Editing => {
                    return Err(OverrideError::NoSession {
                        candidate: candidate.clone(),
                        criterion,
                    })
                }
            }
            session.state = SessionState::Submitting;
        }

        match self.backend.delete_override(candidate, criterion) {
            Ok(receipt) => {
                self.sessions.remove(&key);
                if let Some(model) = self.confirmed.get_mut(candidate) {
                    model.restore_system_value(criterion, receipt.system_value);
                }
                Ok(self.finish_mutation(candidate))
            }
            Err(err) => {
                if let Some(session) = self.sessions.get_mut(&key) {
                    session.state = SessionState::ConfirmingReset;
                    session.last_error = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }

    /// The potential score is an always-available control with no session and
    /// no delete path: validate, upsert, reconcile.
    pub fn update_potential(
        &mut self,
        candidate: &CandidateId,
        value: f32,
    ) -> Result<MutationOutcome, OverrideError> {
        if !(0.0..=POTENTIAL_MAX).contains(&value) {
            return Err(ValidationError::PotentialOutOfRange {
                value,
                max: POTENTIAL_MAX,
            }
            .into());
        }

        self.backend.put_potential(candidate, value)?;
        if let Some(model) = self.confirmed.get_mut(candidate) {
            model.set_potential(value);
        }
        Ok(self.finish_mutation(candidate))
    }

    /// Active overrides for badge pre-population, without opening a session.
    pub fn list_overrides(
        &self,
        candidate: &CandidateId,
    ) -> Result<BTreeMap<Criterion, CriterionOverride>, BackendError> {
        self.backend.list_overrides(candidate)
    }

    pub fn session(&self, candidate: &CandidateId, criterion: Criterion) -> Option<&EditSession> {
        self.sessions.get(&SessionKey::new(candidate, criterion))
    }

    pub fn last_confirmed(&self, candidate: &CandidateId) -> Option<&AssessmentModel> {
        self.confirmed.get(candidate)
    }

    fn confirmed_or_fetch(&mut self, candidate: &CandidateId) -> Result<AssessmentModel, BackendError> {
        if let Some(model) = self.confirmed.get(candidate) {
            return Ok(model.clone());
        }
        let model = self.backend.get_assessment(candidate)?;
        self.confirmed.insert(candidate.clone(), model.clone());
        Ok(model)
    }

    /// The write is already durable here; a failed refresh degrades to a
    /// warning and the regions keep their last-confirmed values.
    fn finish_mutation(&mut self, candidate: &CandidateId) -> MutationOutcome {
        match self.reconciler.recalculate(candidate) {
            Ok(model) => {
                self.confirmed.insert(candidate.clone(), model.clone());
                MutationOutcome {
                    candidate: candidate.clone(),
                    refreshed: Some(model),
                    warning: None,
                }
            }
            Err(err) => {
                warn!(
                    candidate = %candidate,
                    error = %err,
                    "override saved but the view refresh failed; displayed totals may be stale"
                );
                MutationOutcome {
                    candidate: candidate.clone(),
                    refreshed: None,
                    warning: Some(ReconcileWarning {
                        candidate: candidate.clone(),
                        detail: err.to_string(),
                    }),
                }
            }
        }
    }
}

fn validate_override(criterion: Criterion, value: f32, reason: &str) -> Result<(), ValidationError> {
    let max = criterion.max_points();
    if !(0.0..=max).contains(&value) {
        return Err(ValidationError::ScoreOutOfRange {
            criterion,
            value,
            max,
        });
    }
    if reason.trim().is_empty() {
        return Err(ValidationError::EmptyReason);
    }
    Ok(())
}
