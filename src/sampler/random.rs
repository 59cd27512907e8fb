//! Random sampler implementation.

use parking_lot::Mutex;

use crate::distribution::Distribution;
use crate::error::Result;
use crate::sampler::Sampler;
use crate::storage::Storage;
use crate::types::StudyId;

/// A simple random sampler that samples uniformly from distributions.
///
/// This sampler ignores the trial history.  It is the default sampler of
/// every study.
///
/// # Examples
///
/// ```
/// use trialrun::sampler::RandomSampler;
///
/// // Create with default RNG
/// let sampler = RandomSampler::new();
///
/// // Create with a fixed seed for reproducibility
/// let sampler = RandomSampler::with_seed(42);
/// ```
pub struct RandomSampler {
    rng: Mutex<fastrand::Rng>,
}

impl RandomSampler {
    /// Creates a new random sampler with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new random sampler with a fixed seed for reproducibility.
    ///
    /// Using the same seed will produce the same sequence of sampled values.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RandomSampler {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn sample(
        &self,
        _storage: &dyn Storage,
        _study_id: StudyId,
        _param_name: &str,
        distribution: &Distribution,
    ) -> Result<f64> {
        let mut rng = self.rng.lock();

        let value = match distribution {
            Distribution::Uniform { low, high } => uniform(&mut rng, *low, *high),
            Distribution::LogUniform { low, high } => {
                uniform(&mut rng, low.ln(), high.ln()).exp()
            }
            Distribution::DiscreteUniform { low, high, q } => {
                let n_steps = ((high - low) / q).floor() as i64;
                let k = rng.i64(0..=n_steps);
                (low + (k as f64) * q).min(*high)
            }
            Distribution::IntUniform { low, high } => rng.i64(*low..=*high) as f64,
            Distribution::Categorical { choices } => rng.usize(0..choices.len()) as f64,
        };
        Ok(value)
    }
}

/// Draw from `[low, high)`.
fn uniform(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}
