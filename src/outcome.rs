//! Classification of a single objective invocation.

use core::any::Any;
use core::fmt;

use crate::error::{Error, TrialPruned};
use crate::objective::{Catch, ObjectiveValue};
use crate::types::{TrialId, TrialState};

/// What the runner does with a finished objective call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    /// The objective returned a usable value.
    Complete(f64),
    /// The objective asked to be pruned.
    Pruned,
    /// The trial failed and the run continues.
    Fail { reason: String },
    /// The error was rejected by the catch filter; the run aborts.
    Uncaught { reason: String },
}

/// Returns `true` if `e` is the pruning signal, either
/// [`Error::TrialPruned`] or the [`TrialPruned`] marker.
pub(crate) fn is_trial_pruned<E: 'static>(e: &E) -> bool {
    let any: &dyn Any = e;
    matches!(any.downcast_ref::<Error>(), Some(Error::TrialPruned))
        || any.downcast_ref::<TrialPruned>().is_some()
}

/// Map the result of one objective call to an [`Outcome`].
pub(crate) fn classify<T, E>(
    trial_id: TrialId,
    result: Result<T, E>,
    catch: &Catch<E>,
) -> Outcome
where
    T: ObjectiveValue,
    E: fmt::Display + 'static,
{
    let value = match result {
        Ok(value) => value,
        Err(e) if is_trial_pruned(&e) => return Outcome::Pruned,
        Err(e) => {
            let reason = format!(
                "Setting status of trial#{trial_id} as {} because of the following error: {e}",
                TrialState::Fail
            );
            return if catch.matches(&e) {
                Outcome::Fail { reason }
            } else {
                Outcome::Uncaught { reason }
            };
        }
    };

    match value.to_f64() {
        None => Outcome::Fail {
            reason: format!(
                "Setting status of trial#{trial_id} as {} because the returned value from the \
                 objective function cannot be cast to float. Returned value is: {value:?}",
                TrialState::Fail
            ),
        },
        Some(v) if v.is_nan() => Outcome::Fail {
            reason: format!(
                "Setting status of trial#{trial_id} as {} because the objective function \
                 returned {value:?}.",
                TrialState::Fail
            ),
        },
        Some(v) => Outcome::Complete(v),
    }
}
