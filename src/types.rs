//! Core types for the trial engine.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifier of a study inside a storage backend.
pub type StudyId = u64;

/// Identifier of a trial inside a storage backend. Unique across studies.
pub type TrialId = u64;

/// The direction of optimization.
///
/// Both directions parse from their lowercase names, but only
/// [`Minimize`](Direction::Minimize) can be used to build a study.
///
/// ```
/// use trialrun::Direction;
///
/// assert_eq!("minimize".parse::<Direction>().unwrap(), Direction::Minimize);
/// assert!("sideways".parse::<Direction>().is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Minimize the objective value.
    Minimize,
    /// Maximize the objective value.
    Maximize,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimize" => Ok(Direction::Minimize),
            "maximize" => Ok(Direction::Maximize),
            other => Err(Error::InvalidDirection(other.to_string())),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Minimize => "minimize",
            Direction::Maximize => "maximize",
        })
    }
}

/// The state of a trial in its lifecycle.
///
/// Every trial starts `Running` and moves exactly once to one of the
/// three terminal states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialState {
    /// The trial is currently running.
    Running,
    /// The objective returned a usable value.
    Complete,
    /// The objective signalled early stopping.
    Pruned,
    /// The objective failed or returned an unusable value.
    Fail,
}

impl TrialState {
    /// Returns `true` for the three terminal states.
    #[must_use]
    pub fn is_finished(self) -> bool {
        !matches!(self, TrialState::Running)
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrialState::Running => "RUNNING",
            TrialState::Complete => "COMPLETE",
            TrialState::Pruned => "PRUNED",
            TrialState::Fail => "FAIL",
        })
    }
}
