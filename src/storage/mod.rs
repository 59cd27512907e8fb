//! Study and trial storage backends.
//!
//! The [`Storage`] trait is the durable record every [`Study`](crate::Study)
//! reads and writes through.  A study holds an `Arc<dyn Storage>`, and the
//! same handle is shared by every worker of a parallel run, so all methods
//! take `&self` and implementations must serialize their own writes.
//!
//! # Available backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`InMemoryStorage`] | Studies and trials behind a read-write lock (the default) |
//!
//! # Contract
//!
//! - [`create_new_trial_id`](Storage::create_new_trial_id) is atomic: two
//!   concurrent callers never receive the same id.
//! - A trial moves from `Running` to a terminal state exactly once; further
//!   writes to a finished trial return [`Error::TrialAlreadyFinished`](crate::Error::TrialAlreadyFinished).
//! - [`get_best_trial`](Storage::get_best_trial) returns the completed trial
//!   with the lowest value.  The default implementation scans all trials;
//!   backends may keep an index instead.
//! - Sessions are per worker thread. The engine calls
//!   [`acquire_session`](Storage::acquire_session) when a worker starts and
//!   [`release_session`](Storage::release_session) when it exits, including
//!   on unwinding.

mod memory;

use std::collections::HashMap;

pub use memory::InMemoryStorage;

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary};
use crate::trial::AttrValue;
use crate::types::{Direction, StudyId, TrialId, TrialState};

/// Trait for persisting studies and their trials.
pub trait Storage: Send + Sync {
    /// Create a study record and return its id.
    ///
    /// A name is generated when `study_name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateStudyName`] if the name is taken.
    fn create_new_study_id(&self, study_name: Option<&str>) -> Result<StudyId>;

    /// Resolve a study id from its name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] for unknown names.
    fn get_study_id_from_name(&self, study_name: &str) -> Result<StudyId>;

    /// Resolve a study name from its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn get_study_name_from_id(&self, study_id: StudyId) -> Result<String>;

    /// Record the optimization direction of a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn set_study_direction(&self, study_id: StudyId, direction: Direction) -> Result<()>;

    /// Return the recorded optimization direction of a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn get_study_direction(&self, study_id: StudyId) -> Result<Direction>;

    /// Set a user attribute on a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn set_study_user_attr(&self, study_id: StudyId, key: &str, value: AttrValue) -> Result<()>;

    /// Set a system attribute on a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn set_study_system_attr(&self, study_id: StudyId, key: &str, value: AttrValue)
    -> Result<()>;

    /// Return all user attributes of a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn get_study_user_attrs(&self, study_id: StudyId) -> Result<HashMap<String, AttrValue>>;

    /// Return all system attributes of a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn get_study_system_attrs(&self, study_id: StudyId) -> Result<HashMap<String, AttrValue>>;

    /// Summarize every study in the backend, ordered by id.
    ///
    /// # Errors
    ///
    /// Backend-specific read failures.
    fn get_all_study_summaries(&self) -> Result<Vec<StudySummary>>;

    /// Atomically allocate a new running trial in a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn create_new_trial_id(&self, study_id: StudyId) -> Result<TrialId>;

    /// Move a trial to `state`.
    ///
    /// Moving into a terminal state stamps `datetime_complete`. A terminal
    /// state other than [`TrialState::Complete`] clears the trial's value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] for unknown ids and
    /// [`Error::TrialAlreadyFinished`] if the trial already finished.
    fn set_trial_state(&self, trial_id: TrialId, state: TrialState) -> Result<()>;

    /// Set the objective value of a running trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] or [`Error::TrialAlreadyFinished`].
    fn set_trial_value(&self, trial_id: TrialId, value: f64) -> Result<()>;

    /// Record an intermediate value of a running trial at `step`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] or [`Error::TrialAlreadyFinished`].
    fn set_trial_intermediate_value(&self, trial_id: TrialId, step: u64, value: f64)
    -> Result<()>;

    /// Record a suggested parameter.
    ///
    /// Returns `false` without writing when the parameter is already set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] or [`Error::TrialAlreadyFinished`].
    fn set_trial_param(
        &self,
        trial_id: TrialId,
        name: &str,
        internal: f64,
        distribution: &Distribution,
    ) -> Result<bool>;

    /// Set a user attribute on a running trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] or [`Error::TrialAlreadyFinished`].
    fn set_trial_user_attr(&self, trial_id: TrialId, key: &str, value: AttrValue) -> Result<()>;

    /// Set a system attribute on a running trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] or [`Error::TrialAlreadyFinished`].
    fn set_trial_system_attr(&self, trial_id: TrialId, key: &str, value: AttrValue)
    -> Result<()>;

    /// Return a snapshot of one trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrialNotFound`] for unknown ids.
    fn get_trial(&self, trial_id: TrialId) -> Result<FrozenTrial>;

    /// Return snapshots of every trial of a study, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn get_all_trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>>;

    /// Return the completed trial with the lowest value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    fn get_best_trial(&self, study_id: StudyId) -> Result<FrozenTrial> {
        self.get_all_trials(study_id)?
            .into_iter()
            .filter(|t| t.state == TrialState::Complete)
            .filter_map(|t| t.value.map(|v| (v, t)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(_, t)| t)
            .ok_or(Error::NoCompletedTrials)
    }

    /// Count the trials of a study, optionally restricted to one state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownStudyId`] for unknown ids.
    fn get_n_trials(&self, study_id: StudyId, state: Option<TrialState>) -> Result<usize> {
        Ok(self
            .get_all_trials(study_id)?
            .iter()
            .filter(|t| state.is_none_or(|s| t.state == s))
            .count())
    }

    /// Open the per-worker session. The default is a no-op.
    fn acquire_session(&self) {}

    /// Close the per-worker session. The default is a no-op.
    fn release_session(&self) {}
}
