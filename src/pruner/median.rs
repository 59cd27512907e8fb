use super::Pruner;
use crate::error::Result;
use crate::storage::Storage;
use crate::types::{StudyId, TrialId, TrialState};

/// Prune trials whose best intermediate value is worse than the median of
/// completed trials at the same step.
///
/// This is the default pruner of every study.
///
/// # Examples
///
/// ```
/// use trialrun::pruner::MedianPruner;
///
/// // Wait for 10 completed trials, never prune before step 3.
/// let pruner = MedianPruner::new().n_startup_trials(10).n_warmup_steps(3);
/// ```
pub struct MedianPruner {
    /// Require at least N completed trials before pruning.
    n_startup_trials: usize,
    /// Don't prune in the first N steps (let the trial warm up).
    n_warmup_steps: u64,
}

impl MedianPruner {
    /// Create a pruner with 5 startup trials and no warmup steps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_startup_trials: 5,
            n_warmup_steps: 0,
        }
    }

    /// Set the number of completed trials required before pruning.
    #[must_use]
    pub fn n_startup_trials(mut self, n: usize) -> Self {
        self.n_startup_trials = n;
        self
    }

    /// Set the number of warmup steps. No pruning occurs before this step.
    #[must_use]
    pub fn n_warmup_steps(mut self, n: u64) -> Self {
        self.n_warmup_steps = n;
        self
    }
}

impl Default for MedianPruner {
    fn default() -> Self {
        Self::new()
    }
}

impl Pruner for MedianPruner {
    fn prune(
        &self,
        storage: &dyn Storage,
        study_id: StudyId,
        trial_id: TrialId,
        step: u64,
    ) -> Result<bool> {
        if step < self.n_warmup_steps {
            return Ok(false);
        }

        let trials = storage.get_all_trials(study_id)?;
        let completed: Vec<_> = trials
            .iter()
            .filter(|t| t.state == TrialState::Complete)
            .collect();
        if completed.is_empty() || completed.len() < self.n_startup_trials {
            return Ok(false);
        }

        let current = storage.get_trial(trial_id)?;
        let Some(best_so_far) = current
            .intermediate_values
            .range(..=step)
            .map(|(_, &v)| v)
            .min_by(f64::total_cmp)
        else {
            return Ok(false);
        };

        let mut values_at_step: Vec<f64> = completed
            .iter()
            .filter_map(|t| t.intermediate_values.get(&step).copied())
            .filter(|v| !v.is_nan())
            .collect();
        if values_at_step.is_empty() {
            return Ok(false);
        }

        Ok(best_so_far > compute_median(&mut values_at_step))
    }
}

/// Compute the median of a non-empty slice. Sorts the slice in place.
fn compute_median(values: &mut [f64]) -> f64 {
    values.sort_unstable_by(f64::total_cmp);
    let len = values.len();
    if len % 2 == 1 {
        values[len / 2]
    } else {
        f64::midpoint(values[len / 2 - 1], values[len / 2])
    }
}
