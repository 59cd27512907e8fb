//! Parameter distribution types.
//!
//! Samplers work in an internal `f64` representation; the trial hands the
//! objective the external [`ParamValue`]. Categorical choices are
//! represented internally by their index.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;

/// A search-space distribution for one named parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Distribution {
    /// Continuous values in `[low, high)`.
    Uniform {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (exclusive).
        high: f64,
    },
    /// Continuous values in `[low, high)`, sampled uniformly in log space.
    LogUniform {
        /// Lower bound (inclusive, positive).
        low: f64,
        /// Upper bound (exclusive).
        high: f64,
    },
    /// Values `low + k * q` within `[low, high]`.
    DiscreteUniform {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
        /// Step between values.
        q: f64,
    },
    /// Integers in `[low, high]`.
    IntUniform {
        /// Lower bound (inclusive).
        low: i64,
        /// Upper bound (inclusive).
        high: i64,
    },
    /// One of a fixed list of choices.
    Categorical {
        /// The available choices.
        choices: Vec<ParamValue>,
    },
}

impl Distribution {
    /// Convert a sampler-space value into the value handed to the objective.
    ///
    /// Returns `None` for a categorical distribution without choices.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_external_repr(&self, internal: f64) -> Option<ParamValue> {
        match self {
            Distribution::Uniform { .. }
            | Distribution::LogUniform { .. }
            | Distribution::DiscreteUniform { .. } => Some(ParamValue::Float(internal)),
            Distribution::IntUniform { .. } => Some(ParamValue::Int(internal.round() as i64)),
            Distribution::Categorical { choices } => {
                let index = (internal.max(0.0) as usize).min(choices.len().saturating_sub(1));
                choices.get(index).cloned()
            }
        }
    }

    /// [`to_external_repr`](Self::to_external_repr) for parameter `name`,
    /// failing the way [`validate`](Self::validate) does.
    pub(crate) fn external_value(&self, name: &str, internal: f64) -> Result<ParamValue> {
        self.to_external_repr(internal)
            .ok_or_else(|| Error::InvalidDistribution {
                name: name.to_string(),
                reason: "categorical choices cannot be empty".to_string(),
            })
    }

    /// Convert an external value back into its sampler-space representation.
    ///
    /// Returns `None` when the value is not representable, e.g. a choice that
    /// is not part of a categorical distribution.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_internal_repr(&self, external: &ParamValue) -> Option<f64> {
        match self {
            Distribution::Categorical { choices } => {
                choices.iter().position(|c| c == external).map(|i| i as f64)
            }
            _ => external.as_f64(),
        }
    }

    /// Returns `true` if the distribution admits exactly one value.
    #[must_use]
    pub fn single(&self) -> bool {
        match self {
            Distribution::Uniform { low, high }
            | Distribution::LogUniform { low, high }
            | Distribution::DiscreteUniform { low, high, .. } => (high - low).abs() < f64::EPSILON,
            Distribution::IntUniform { low, high } => low == high,
            Distribution::Categorical { choices } => choices.len() == 1,
        }
    }

    /// Returns `true` if `internal` lies inside the distribution's support.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn contains(&self, internal: f64) -> bool {
        match self {
            Distribution::Uniform { low, high } | Distribution::LogUniform { low, high } => {
                if self.single() {
                    internal == *low
                } else {
                    *low <= internal && internal < *high
                }
            }
            Distribution::DiscreteUniform { low, high, .. } => *low <= internal && internal <= *high,
            Distribution::IntUniform { low, high } => {
                *low as f64 <= internal && internal <= *high as f64
            }
            Distribution::Categorical { choices } => {
                internal >= 0.0 && internal < choices.len() as f64 && internal.fract() == 0.0
            }
        }
    }

    /// Check that the distribution is well formed.
    pub(crate) fn validate(&self, name: &str) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidDistribution {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match self {
            Distribution::Uniform { low, high } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
            }
            Distribution::LogUniform { low, high } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
                if *low <= 0.0 {
                    return Err(invalid("log scale requires a positive lower bound"));
                }
            }
            Distribution::DiscreteUniform { low, high, q } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
                if *q <= 0.0 {
                    return Err(invalid("q must be positive"));
                }
            }
            Distribution::IntUniform { low, high } => {
                if low > high {
                    return Err(invalid("low must not exceed high"));
                }
            }
            Distribution::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(invalid("categorical choices cannot be empty"));
                }
            }
        }
        Ok(())
    }
}
