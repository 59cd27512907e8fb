//! Pruner trait and implementations for trial pruning.
//!
//! Pruners decide whether to stop (prune) a trial early based on its
//! intermediate values compared to other trials.  The engine never calls a
//! pruner itself: the objective asks through
//! [`Trial::should_prune`](crate::Trial::should_prune) and reacts by
//! returning [`TrialPruned`](crate::TrialPruned).

mod median;
mod nop;

pub use median::MedianPruner;
pub use nop::NopPruner;

use crate::error::Result;
use crate::storage::Storage;
use crate::types::{StudyId, TrialId};

/// Trait for pluggable trial pruning strategies.
///
/// The trait requires `Send + Sync` because parallel workers share one
/// pruner.
///
/// # Implementing a custom pruner
///
/// ```
/// use trialrun::pruner::Pruner;
/// use trialrun::storage::Storage;
///
/// struct ThresholdPruner {
///     threshold: f64,
/// }
///
/// impl Pruner for ThresholdPruner {
///     fn prune(
///         &self,
///         storage: &dyn Storage,
///         _study_id: u64,
///         trial_id: u64,
///         step: u64,
///     ) -> trialrun::Result<bool> {
///         let trial = storage.get_trial(trial_id)?;
///         Ok(trial
///             .intermediate_values
///             .get(&step)
///             .is_some_and(|&v| v > self.threshold))
///     }
/// }
/// ```
pub trait Pruner: Send + Sync {
    /// Decide whether `trial_id` should stop at `step`.
    ///
    /// # Errors
    ///
    /// Implementations may fail when reading from `storage`.
    fn prune(
        &self,
        storage: &dyn Storage,
        study_id: StudyId,
        trial_id: TrialId,
        step: u64,
    ) -> Result<bool>;
}
