//! Persisted trial and study records.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::param::ParamValue;
use crate::trial::AttrValue;
use crate::types::{Direction, StudyId, TrialId, TrialState};

/// System attribute key under which the reason of a failed trial is stored.
pub const FAIL_REASON_KEY: &str = "fail_reason";

/// An immutable snapshot of a trial as recorded by a storage backend.
///
/// Field declaration order is significant: tabular export lays out its
/// columns in the order of [`FrozenTrial::FIELDS`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrozenTrial {
    /// The unique identifier for this trial.
    pub trial_id: TrialId,
    /// The lifecycle state.
    pub state: TrialState,
    /// The objective value; only set for completed trials.
    pub value: Option<f64>,
    /// When the trial id was allocated.
    pub datetime_start: Option<DateTime<Utc>>,
    /// When the trial reached its terminal state.
    pub datetime_complete: Option<DateTime<Utc>>,
    /// Suggested parameter values, keyed by parameter name.
    pub params: HashMap<String, ParamValue>,
    /// User-defined attributes set during the trial.
    pub user_attrs: HashMap<String, AttrValue>,
    /// Engine-defined attributes, e.g. [`FAIL_REASON_KEY`].
    pub system_attrs: HashMap<String, AttrValue>,
    /// Intermediate values reported by the objective, keyed by step.
    pub intermediate_values: BTreeMap<u64, f64>,
    /// Parameter values in the samplers' internal representation.
    pub params_in_internal_repr: HashMap<String, f64>,
}

impl FrozenTrial {
    /// Names of all record fields, in declaration order.
    pub const FIELDS: [&'static str; 10] = [
        "trial_id",
        "state",
        "value",
        "datetime_start",
        "datetime_complete",
        "params",
        "user_attrs",
        "system_attrs",
        "intermediate_values",
        "params_in_internal_repr",
    ];

    /// Fields that are bookkeeping for samplers and never exported.
    pub const INTERNAL_FIELDS: [&'static str; 1] = ["params_in_internal_repr"];

    /// Creates the record of a freshly allocated, running trial.
    #[must_use]
    pub fn running(trial_id: TrialId, started: DateTime<Utc>) -> Self {
        Self {
            trial_id,
            state: TrialState::Running,
            value: None,
            datetime_start: Some(started),
            datetime_complete: None,
            params: HashMap::new(),
            user_attrs: HashMap::new(),
            system_attrs: HashMap::new(),
            intermediate_values: BTreeMap::new(),
            params_in_internal_repr: HashMap::new(),
        }
    }

    /// Returns the highest step reported so far.
    #[must_use]
    pub fn last_step(&self) -> Option<u64> {
        self.intermediate_values.keys().next_back().copied()
    }

    /// Gets a user attribute by key.
    #[must_use]
    pub fn user_attr(&self, key: &str) -> Option<&AttrValue> {
        self.user_attrs.get(key)
    }

    /// Gets a system attribute by key.
    #[must_use]
    pub fn system_attr(&self, key: &str) -> Option<&AttrValue> {
        self.system_attrs.get(key)
    }

    /// Returns the recorded failure reason of a failed trial.
    #[must_use]
    pub fn fail_reason(&self) -> Option<&str> {
        match self.system_attrs.get(FAIL_REASON_KEY) {
            Some(AttrValue::String(reason)) => Some(reason),
            _ => None,
        }
    }
}

/// Aggregated view of one study, as listed by
/// [`get_all_study_summaries`](crate::get_all_study_summaries).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StudySummary {
    /// The study's name.
    pub study_name: String,
    /// The study's identifier in its storage backend.
    pub study_id: StudyId,
    /// The recorded optimization direction.
    pub direction: Direction,
    /// The best completed trial, if any.
    pub best_trial: Option<FrozenTrial>,
    /// User attributes of the study.
    pub user_attrs: HashMap<String, AttrValue>,
    /// System attributes of the study.
    pub system_attrs: HashMap<String, AttrValue>,
    /// Number of trials in any state.
    pub n_trials: usize,
    /// Start time of the earliest trial.
    pub datetime_start: Option<DateTime<Utc>>,
}
