//! The runtime trial handle passed to objective functions.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::pruner::Pruner;
use crate::sampler::Sampler;
use crate::storage::Storage;
use crate::types::{StudyId, TrialId};

/// A user or system attribute value attached to a trial or study.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttrValue {
    /// A floating-point attribute.
    Float(f64),
    /// An integer attribute.
    Int(i64),
    /// A string attribute.
    String(String),
    /// A boolean attribute.
    Bool(bool),
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Float(v) => write!(f, "{v}"),
            AttrValue::Int(v) => write!(f, "{v}"),
            AttrValue::String(v) => f.write_str(v),
            AttrValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        AttrValue::Int(i64::from(v))
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::String(v.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::String(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

/// A trial represents a single evaluation of the objective function.
///
/// The engine allocates one trial per evaluation and hands it to the
/// objective as `&mut Trial`.  Every call goes straight to the study's
/// storage, so values suggested or reported here are visible to other
/// workers immediately.
///
/// # Examples
///
/// ```
/// use trialrun::{OptimizeOptions, Study, Trial};
///
/// let study = Study::builder().build().unwrap();
/// study
///     .optimize(
///         |trial: &mut Trial| {
///             let x = trial.suggest_uniform("x", -10.0, 10.0)?;
///             let n = trial.suggest_int("n", 1, 4)?;
///             trial.set_user_attr("note", "quadratic")?;
///             Ok::<_, trialrun::Error>((x - 2.0).powi(2) + n as f64)
///         },
///         OptimizeOptions::new().n_trials(5),
///     )
///     .unwrap();
/// assert_eq!(study.trials().unwrap().len(), 5);
/// ```
pub struct Trial {
    trial_id: TrialId,
    study_id: StudyId,
    storage: Arc<dyn Storage>,
    sampler: Arc<dyn Sampler>,
    pruner: Arc<dyn Pruner>,
    /// Distributions suggested through this handle, for conflict detection.
    distributions: HashMap<String, Distribution>,
}

impl fmt::Debug for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trial")
            .field("trial_id", &self.trial_id)
            .field("study_id", &self.study_id)
            .field("distributions", &self.distributions)
            .finish_non_exhaustive()
    }
}

impl Trial {
    pub(crate) fn new(
        trial_id: TrialId,
        study_id: StudyId,
        storage: Arc<dyn Storage>,
        sampler: Arc<dyn Sampler>,
        pruner: Arc<dyn Pruner>,
    ) -> Self {
        Self {
            trial_id,
            study_id,
            storage,
            sampler,
            pruner,
            distributions: HashMap::new(),
        }
    }

    /// Returns the unique ID of this trial.
    #[must_use]
    pub fn id(&self) -> TrialId {
        self.trial_id
    }

    /// Returns the ID of the study this trial belongs to.
    #[must_use]
    pub fn study_id(&self) -> StudyId {
        self.study_id
    }

    /// Suggest a value for `name` from an arbitrary distribution.
    ///
    /// Suggesting the same name twice returns the first value.  A second
    /// suggestion with a different distribution is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDistribution`] for malformed distributions,
    /// [`Error::ParameterConflict`] for a conflicting re-suggestion, and any
    /// storage or sampler error.
    pub fn suggest(&mut self, name: &str, distribution: Distribution) -> Result<ParamValue> {
        distribution.validate(name)?;

        if let Some(existing) = self.distributions.get(name) {
            if *existing != distribution {
                return Err(Error::ParameterConflict {
                    name: name.to_string(),
                    reason: format!(
                        "previously suggested from {existing:?}, now from {distribution:?}"
                    ),
                });
            }
        }

        let internal = if distribution.single() {
            single_value(&distribution)
        } else {
            self.sampler
                .sample(&*self.storage, self.study_id, name, &distribution)?
        };

        let written = self
            .storage
            .set_trial_param(self.trial_id, name, internal, &distribution)?;
        self.distributions.insert(name.to_string(), distribution.clone());

        if written {
            distribution.external_value(name, internal)
        } else {
            let stored = self.storage.get_trial(self.trial_id)?;
            let &internal = stored.params_in_internal_repr.get(name).ok_or_else(|| {
                Error::ParameterConflict {
                    name: name.to_string(),
                    reason: "parameter vanished from storage".to_string(),
                }
            })?;
            distribution.external_value(name, internal)
        }
    }

    /// Suggest a float in `[low, high)`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest).
    pub fn suggest_uniform(&mut self, name: &str, low: f64, high: f64) -> Result<f64> {
        let value = self.suggest(name, Distribution::Uniform { low, high })?;
        expect_float(name, &value)
    }

    /// Suggest a float in `[low, high)` sampled in log space.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest).
    pub fn suggest_loguniform(&mut self, name: &str, low: f64, high: f64) -> Result<f64> {
        let value = self.suggest(name, Distribution::LogUniform { low, high })?;
        expect_float(name, &value)
    }

    /// Suggest a float from the grid `low, low + q, ..., high`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest).
    pub fn suggest_discrete_uniform(
        &mut self,
        name: &str,
        low: f64,
        high: f64,
        q: f64,
    ) -> Result<f64> {
        let value = self.suggest(name, Distribution::DiscreteUniform { low, high, q })?;
        expect_float(name, &value)
    }

    /// Suggest an integer in `[low, high]`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest).
    pub fn suggest_int(&mut self, name: &str, low: i64, high: i64) -> Result<i64> {
        match self.suggest(name, Distribution::IntUniform { low, high })? {
            ParamValue::Int(v) => Ok(v),
            other => Err(Error::ParameterConflict {
                name: name.to_string(),
                reason: format!("expected an integer, stored value is {other}"),
            }),
        }
    }

    /// Suggest one of `choices`.
    ///
    /// # Errors
    ///
    /// See [`suggest`](Self::suggest).
    pub fn suggest_categorical<T>(&mut self, name: &str, choices: &[T]) -> Result<ParamValue>
    where
        T: Clone + Into<ParamValue>,
    {
        let choices = choices.iter().cloned().map(Into::into).collect();
        self.suggest(name, Distribution::Categorical { choices })
    }

    /// Report an objective value.
    ///
    /// With a `step`, the value is recorded as the intermediate value at that
    /// step, which pruners inspect.  Without one, it becomes the trial's
    /// provisional value: a completing trial replaces it with the returned
    /// value, and a pruned or failed trial drops it.
    ///
    /// # Errors
    ///
    /// Returns a storage error, e.g. if the trial already finished.
    pub fn report(&self, value: f64, step: Option<u64>) -> Result<()> {
        match step {
            Some(step) => self
                .storage
                .set_trial_intermediate_value(self.trial_id, step, value),
            None => self.storage.set_trial_value(self.trial_id, value),
        }
    }

    /// Record the final objective value as both the trial's value and its
    /// last intermediate report.
    ///
    /// After a report at `u64::MAX` there is no later step, so only the
    /// trial's value is written.
    pub(crate) fn report_final(&self, value: f64) -> Result<()> {
        self.report(value, None)?;
        let last_step = self.storage.get_trial(self.trial_id)?.last_step();
        match last_step.map_or(Some(0), |s| s.checked_add(1)) {
            Some(next_step) => self.report(value, Some(next_step)),
            None => Ok(()),
        }
    }

    /// Ask the study's pruner whether this trial should stop at `step`.
    ///
    /// The objective reacts by returning [`TrialPruned`](crate::TrialPruned).
    ///
    /// # Errors
    ///
    /// Returns any error raised by the pruner or storage.
    pub fn should_prune(&self, step: u64) -> Result<bool> {
        self.pruner
            .prune(&*self.storage, self.study_id, self.trial_id, step)
    }

    /// Set a user attribute on this trial.
    ///
    /// # Errors
    ///
    /// Returns a storage error, e.g. if the trial already finished.
    pub fn set_user_attr(&self, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        self.storage
            .set_trial_user_attr(self.trial_id, key, value.into())
    }

    /// Set a system attribute on this trial.
    ///
    /// # Errors
    ///
    /// Returns a storage error, e.g. if the trial already finished.
    pub fn set_system_attr(&self, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        self.storage
            .set_trial_system_attr(self.trial_id, key, value.into())
    }

    /// Return the parameters suggested so far.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn params(&self) -> Result<HashMap<String, ParamValue>> {
        Ok(self.storage.get_trial(self.trial_id)?.params)
    }

    /// Return the user attributes set so far.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn user_attrs(&self) -> Result<HashMap<String, AttrValue>> {
        Ok(self.storage.get_trial(self.trial_id)?.user_attrs)
    }

    /// Return the system attributes set so far.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn system_attrs(&self) -> Result<HashMap<String, AttrValue>> {
        Ok(self.storage.get_trial(self.trial_id)?.system_attrs)
    }

    /// Return when this trial started.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn datetime_start(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.storage.get_trial(self.trial_id)?.datetime_start)
    }
}

/// The only internal value of a single-valued distribution.
#[allow(clippy::cast_precision_loss)]
fn single_value(distribution: &Distribution) -> f64 {
    match distribution {
        Distribution::Uniform { low, .. }
        | Distribution::LogUniform { low, .. }
        | Distribution::DiscreteUniform { low, .. } => *low,
        Distribution::IntUniform { low, .. } => *low as f64,
        Distribution::Categorical { .. } => 0.0,
    }
}

fn expect_float(name: &str, value: &ParamValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| Error::ParameterConflict {
        name: name.to_string(),
        reason: format!("expected a float, stored value is {value}"),
    })
}
