use core::fmt;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::frozen::FrozenTrial;
use crate::param::ParamValue;
use crate::types::TrialState;

use super::Study;

impl Study {
    /// Return the completed trial with the lowest value.
    ///
    /// This is a fresh storage query; nothing is cached on the study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    ///
    /// # Examples
    ///
    /// ```
    /// use trialrun::{Error, Study, Trial};
    ///
    /// let study = Study::builder().build().unwrap();
    /// assert!(matches!(study.best_trial(), Err(Error::NoCompletedTrials)));
    ///
    /// study
    ///     .optimize_n(3, |trial: &mut Trial| {
    ///         let x = trial.suggest_int("x", 0, 10)?;
    ///         Ok::<_, Error>(x)
    ///     })
    ///     .unwrap();
    /// let best = study.best_trial().unwrap();
    /// assert_eq!(best.value, Some(study.best_value().unwrap()));
    /// ```
    pub fn best_trial(&self) -> Result<FrozenTrial> {
        self.storage.get_best_trial(self.study_id())
    }

    /// Return the lowest value among completed trials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_value(&self) -> Result<f64> {
        self.best_trial()?.value.ok_or(Error::NoCompletedTrials)
    }

    /// Return the parameters of the best trial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCompletedTrials`] if no trial has completed.
    pub fn best_params(&self) -> Result<HashMap<String, ParamValue>> {
        Ok(self.best_trial()?.params)
    }

    /// Return a human-readable summary of the study.
    ///
    /// The summary includes the study name, trial counts by state, and the
    /// best value and parameters when a trial has completed.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    ///
    /// # Examples
    ///
    /// ```
    /// use trialrun::{Study, Trial};
    ///
    /// let study = Study::builder().study_name("demo").build().unwrap();
    /// study
    ///     .optimize_n(2, |_: &mut Trial| Ok::<_, trialrun::Error>(0.42))
    ///     .unwrap();
    ///
    /// let summary = study.summary().unwrap();
    /// assert!(summary.contains("demo"));
    /// assert!(summary.contains("2 complete"));
    /// assert!(summary.contains("0.42"));
    /// ```
    pub fn summary(&self) -> Result<String> {
        use fmt::Write;

        let trials = self.trials()?;
        let count = |state: TrialState| trials.iter().filter(|t| t.state == state).count();

        let mut s = format!(
            "Study '{}': {} | {} trials ({} complete, {} pruned, {} failed, {} running)",
            self.study_name(),
            self.direction(),
            trials.len(),
            count(TrialState::Complete),
            count(TrialState::Pruned),
            count(TrialState::Fail),
            count(TrialState::Running),
        );

        match self.best_trial() {
            Ok(best) => {
                if let Some(value) = best.value {
                    let _ = write!(s, "\nBest value: {value} (trial #{})", best.trial_id);
                }
                if !best.params.is_empty() {
                    s.push_str("\nBest parameters:");
                    let mut params: Vec<_> = best.params.iter().collect();
                    params.sort_by(|a, b| a.0.cmp(b.0));
                    for (name, value) in params {
                        let _ = write!(s, "\n  {name} = {value}");
                    }
                }
            }
            Err(Error::NoCompletedTrials) => {}
            Err(e) => return Err(e),
        }

        Ok(s)
    }
}

impl fmt::Display for Study {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary().map_err(|_| fmt::Error)?;
        f.write_str(&summary)
    }
}
