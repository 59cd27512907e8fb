//! Sampler trait and implementations for parameter sampling.

pub mod random;

pub use random::RandomSampler;

use crate::distribution::Distribution;
use crate::error::Result;
use crate::storage::Storage;
use crate::types::StudyId;

/// Trait for pluggable parameter sampling strategies.
///
/// A sampler receives the study's storage so it can inspect the trial
/// history, and returns the suggested value in the distribution's internal
/// representation (see [`Distribution::to_external_repr`]).  The trait
/// requires `Send + Sync` because parallel workers share one sampler.
///
/// # Implementing a custom sampler
///
/// ```
/// use trialrun::distribution::Distribution;
/// use trialrun::sampler::Sampler;
/// use trialrun::storage::Storage;
///
/// /// Always proposes the lower bound.
/// struct LowSampler;
///
/// impl Sampler for LowSampler {
///     fn sample(
///         &self,
///         _storage: &dyn Storage,
///         _study_id: u64,
///         _param_name: &str,
///         distribution: &Distribution,
///     ) -> trialrun::Result<f64> {
///         Ok(match distribution {
///             Distribution::Uniform { low, .. }
///             | Distribution::LogUniform { low, .. }
///             | Distribution::DiscreteUniform { low, .. } => *low,
///             Distribution::IntUniform { low, .. } => *low as f64,
///             Distribution::Categorical { .. } => 0.0,
///         })
///     }
/// }
/// ```
pub trait Sampler: Send + Sync {
    /// Sample a value for `param_name` from `distribution`.
    ///
    /// # Errors
    ///
    /// Implementations may fail when reading history from `storage`.
    fn sample(
        &self,
        storage: &dyn Storage,
        study_id: StudyId,
        param_name: &str,
        distribution: &Distribution,
    ) -> Result<f64>;
}
