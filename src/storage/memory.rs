use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use parking_lot::RwLock;

use super::Storage;
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary};
use crate::trial::AttrValue;
use crate::types::{Direction, StudyId, TrialId, TrialState};

struct StudyRecord {
    name: String,
    direction: Direction,
    user_attrs: HashMap<String, AttrValue>,
    system_attrs: HashMap<String, AttrValue>,
    trial_ids: Vec<TrialId>,
    /// Completed trial with the lowest value, maintained on completion.
    best_trial_id: Option<TrialId>,
}

#[derive(Default)]
struct Inner {
    studies: BTreeMap<StudyId, StudyRecord>,
    /// Indexed by trial id.
    trials: Vec<(StudyId, FrozenTrial)>,
}

impl Inner {
    fn study(&self, study_id: StudyId) -> Result<&StudyRecord> {
        self.studies
            .get(&study_id)
            .ok_or(Error::UnknownStudyId(study_id))
    }

    fn study_mut(&mut self, study_id: StudyId) -> Result<&mut StudyRecord> {
        self.studies
            .get_mut(&study_id)
            .ok_or(Error::UnknownStudyId(study_id))
    }

    fn trial(&self, trial_id: TrialId) -> Result<&FrozenTrial> {
        usize::try_from(trial_id)
            .ok()
            .and_then(|i| self.trials.get(i))
            .map(|(_, t)| t)
            .ok_or(Error::TrialNotFound(trial_id))
    }

    /// Borrow a trial for writing; finished trials are read-only.
    fn running_trial_mut(&mut self, trial_id: TrialId) -> Result<(StudyId, &mut FrozenTrial)> {
        let (study_id, trial) = usize::try_from(trial_id)
            .ok()
            .and_then(|i| self.trials.get_mut(i))
            .ok_or(Error::TrialNotFound(trial_id))?;
        if trial.state.is_finished() {
            return Err(Error::TrialAlreadyFinished {
                trial_id,
                state: trial.state,
            });
        }
        Ok((*study_id, trial))
    }

    fn best_trial(&self, record: &StudyRecord) -> Option<FrozenTrial> {
        record
            .best_trial_id
            .and_then(|id| self.trial(id).ok())
            .cloned()
    }
}

/// In-memory study and trial storage (the default).
///
/// Trial ids are allocated from one counter shared by all studies, so they
/// are unique across the whole backend.  The best trial of each study is
/// tracked incrementally as trials complete, making
/// [`get_best_trial`](Storage::get_best_trial) O(1).
///
/// # Examples
///
/// ```
/// use trialrun::storage::{InMemoryStorage, Storage};
///
/// let storage = InMemoryStorage::new();
/// let study_id = storage.create_new_study_id(Some("demo")).unwrap();
/// let first = storage.create_new_trial_id(study_id).unwrap();
/// let second = storage.create_new_trial_id(study_id).unwrap();
/// assert_ne!(first, second);
/// ```
pub struct InMemoryStorage {
    inner: RwLock<Inner>,
    sessions_acquired: AtomicUsize,
    sessions_released: AtomicUsize,
}

impl InMemoryStorage {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            sessions_acquired: AtomicUsize::new(0),
            sessions_released: AtomicUsize::new(0),
        }
    }

    /// Number of worker sessions opened so far.
    #[must_use]
    pub fn sessions_acquired(&self) -> usize {
        self.sessions_acquired.load(Ordering::SeqCst)
    }

    /// Number of worker sessions closed so far.
    #[must_use]
    pub fn sessions_released(&self) -> usize {
        self.sessions_released.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for InMemoryStorage {
    fn create_new_study_id(&self, study_name: Option<&str>) -> Result<StudyId> {
        let mut inner = self.inner.write();
        let name = match study_name {
            Some(name) => {
                if inner.studies.values().any(|s| s.name == name) {
                    return Err(Error::DuplicateStudyName(name.to_string()));
                }
                name.to_string()
            }
            None => format!("no-name-{}", uuid::Uuid::new_v4()),
        };
        let study_id = inner
            .studies
            .keys()
            .next_back()
            .map_or(0, |last| last + 1);
        inner.studies.insert(
            study_id,
            StudyRecord {
                name,
                direction: Direction::Minimize,
                user_attrs: HashMap::new(),
                system_attrs: HashMap::new(),
                trial_ids: Vec::new(),
                best_trial_id: None,
            },
        );
        Ok(study_id)
    }

    fn get_study_id_from_name(&self, study_name: &str) -> Result<StudyId> {
        self.inner
            .read()
            .studies
            .iter()
            .find(|(_, s)| s.name == study_name)
            .map(|(&id, _)| id)
            .ok_or_else(|| Error::StudyNotFound(study_name.to_string()))
    }

    fn get_study_name_from_id(&self, study_id: StudyId) -> Result<String> {
        Ok(self.inner.read().study(study_id)?.name.clone())
    }

    fn set_study_direction(&self, study_id: StudyId, direction: Direction) -> Result<()> {
        self.inner.write().study_mut(study_id)?.direction = direction;
        Ok(())
    }

    fn get_study_direction(&self, study_id: StudyId) -> Result<Direction> {
        Ok(self.inner.read().study(study_id)?.direction)
    }

    fn set_study_user_attr(&self, study_id: StudyId, key: &str, value: AttrValue) -> Result<()> {
        self.inner
            .write()
            .study_mut(study_id)?
            .user_attrs
            .insert(key.to_string(), value);
        Ok(())
    }

    fn set_study_system_attr(
        &self,
        study_id: StudyId,
        key: &str,
        value: AttrValue,
    ) -> Result<()> {
        self.inner
            .write()
            .study_mut(study_id)?
            .system_attrs
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get_study_user_attrs(&self, study_id: StudyId) -> Result<HashMap<String, AttrValue>> {
        Ok(self.inner.read().study(study_id)?.user_attrs.clone())
    }

    fn get_study_system_attrs(&self, study_id: StudyId) -> Result<HashMap<String, AttrValue>> {
        Ok(self.inner.read().study(study_id)?.system_attrs.clone())
    }

    fn get_all_study_summaries(&self) -> Result<Vec<StudySummary>> {
        let inner = self.inner.read();
        let summaries = inner
            .studies
            .iter()
            .map(|(&study_id, record)| {
                let datetime_start = record
                    .trial_ids
                    .iter()
                    .filter_map(|&id| inner.trial(id).ok())
                    .filter_map(|t| t.datetime_start)
                    .min();
                StudySummary {
                    study_name: record.name.clone(),
                    study_id,
                    direction: record.direction,
                    best_trial: inner.best_trial(record),
                    user_attrs: record.user_attrs.clone(),
                    system_attrs: record.system_attrs.clone(),
                    n_trials: record.trial_ids.len(),
                    datetime_start,
                }
            })
            .collect();
        Ok(summaries)
    }

    fn create_new_trial_id(&self, study_id: StudyId) -> Result<TrialId> {
        let mut inner = self.inner.write();
        let trial_id = inner.trials.len() as TrialId;
        inner.study_mut(study_id)?.trial_ids.push(trial_id);
        inner
            .trials
            .push((study_id, FrozenTrial::running(trial_id, Utc::now())));
        Ok(trial_id)
    }

    fn set_trial_state(&self, trial_id: TrialId, state: TrialState) -> Result<()> {
        let mut inner = self.inner.write();
        let (study_id, trial) = inner.running_trial_mut(trial_id)?;
        trial.state = state;
        if state.is_finished() {
            trial.datetime_complete = Some(Utc::now());
            if state != TrialState::Complete {
                trial.value = None;
            }
        }
        let completed_value = match state {
            TrialState::Complete => trial.value,
            _ => None,
        };

        if let Some(value) = completed_value {
            let current_best = inner
                .study(study_id)?
                .best_trial_id
                .and_then(|id| inner.trial(id).ok())
                .and_then(|t| t.value);
            if current_best.is_none_or(|best| value < best) {
                inner.study_mut(study_id)?.best_trial_id = Some(trial_id);
            }
        }
        Ok(())
    }

    fn set_trial_value(&self, trial_id: TrialId, value: f64) -> Result<()> {
        self.inner.write().running_trial_mut(trial_id)?.1.value = Some(value);
        Ok(())
    }

    fn set_trial_intermediate_value(
        &self,
        trial_id: TrialId,
        step: u64,
        value: f64,
    ) -> Result<()> {
        self.inner
            .write()
            .running_trial_mut(trial_id)?
            .1
            .intermediate_values
            .insert(step, value);
        Ok(())
    }

    fn set_trial_param(
        &self,
        trial_id: TrialId,
        name: &str,
        internal: f64,
        distribution: &Distribution,
    ) -> Result<bool> {
        let external = distribution.external_value(name, internal)?;
        let mut inner = self.inner.write();
        let (_, trial) = inner.running_trial_mut(trial_id)?;
        if trial.params_in_internal_repr.contains_key(name) {
            return Ok(false);
        }
        trial
            .params_in_internal_repr
            .insert(name.to_string(), internal);
        trial.params.insert(name.to_string(), external);
        Ok(true)
    }

    fn set_trial_user_attr(&self, trial_id: TrialId, key: &str, value: AttrValue) -> Result<()> {
        self.inner
            .write()
            .running_trial_mut(trial_id)?
            .1
            .user_attrs
            .insert(key.to_string(), value);
        Ok(())
    }

    fn set_trial_system_attr(
        &self,
        trial_id: TrialId,
        key: &str,
        value: AttrValue,
    ) -> Result<()> {
        self.inner
            .write()
            .running_trial_mut(trial_id)?
            .1
            .system_attrs
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get_trial(&self, trial_id: TrialId) -> Result<FrozenTrial> {
        self.inner.read().trial(trial_id).cloned()
    }

    fn get_all_trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>> {
        let inner = self.inner.read();
        inner
            .study(study_id)?
            .trial_ids
            .iter()
            .map(|&id| inner.trial(id).cloned())
            .collect()
    }

    fn get_best_trial(&self, study_id: StudyId) -> Result<FrozenTrial> {
        let inner = self.inner.read();
        let record = inner.study(study_id)?;
        inner.best_trial(record).ok_or(Error::NoCompletedTrials)
    }

    fn acquire_session(&self) {
        self.sessions_acquired.fetch_add(1, Ordering::SeqCst);
    }

    fn release_session(&self) {
        self.sessions_released.fetch_add(1, Ordering::SeqCst);
    }
}
