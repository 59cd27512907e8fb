use core::panic::AssertUnwindSafe;
use std::panic;
use std::sync::Arc;

use crate::error::{Error, Result, panic_message};
use crate::frozen::FAIL_REASON_KEY;
use crate::objective::{Catch, Objective};
use crate::outcome::{Outcome, classify};
use crate::trial::Trial;
use crate::types::{TrialId, TrialState};

use super::Study;

impl Study {
    /// Run one trial end to end and record its terminal state.
    ///
    /// Pruned and failed trials are not errors. An uncaught objective error
    /// or a panic is: the trial is still recorded as failed first, so no
    /// trial is ever left running. The same holds when recording the
    /// outcome itself fails.
    pub(super) fn run_trial<O>(&self, objective: &O, catch: &Catch<O::Error>) -> Result<Trial>
    where
        O: Objective + ?Sized,
    {
        let trial_id = self.storage.create_new_trial_id(self.study_id())?;
        let mut trial = Trial::new(
            trial_id,
            self.study_id(),
            Arc::clone(&self.storage),
            Arc::clone(&self.sampler),
            Arc::clone(&self.pruner),
        );

        let result = match panic::catch_unwind(AssertUnwindSafe(|| objective.evaluate(&mut trial)))
        {
            Ok(result) => result,
            Err(payload) => {
                let reason = panic_message(&*payload);
                self.record_failure(
                    trial_id,
                    &format!(
                        "Setting status of trial#{trial_id} as {} because the objective \
                         function panicked: {reason}",
                        TrialState::Fail
                    ),
                )?;
                trace_error!(trial_id, %reason, "objective panicked");
                return Err(Error::ObjectivePanicked { trial_id, reason });
            }
        };

        let outcome = classify(trial_id, result, catch);
        match panic::catch_unwind(AssertUnwindSafe(|| self.finish(&trial, &outcome))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.close_unfinished(
                    trial_id,
                    &format!(
                        "Setting status of trial#{trial_id} as {} because its outcome could \
                         not be recorded: {e}",
                        TrialState::Fail
                    ),
                );
                return Err(e);
            }
            Err(payload) => {
                let reason = panic_message(&*payload);
                self.close_unfinished(
                    trial_id,
                    &format!(
                        "Setting status of trial#{trial_id} as {} because recording its \
                         outcome panicked: {reason}",
                        TrialState::Fail
                    ),
                );
                return Err(Error::RecordPanicked { trial_id, reason });
            }
        }

        match outcome {
            Outcome::Uncaught { reason } => Err(Error::ObjectiveFailed { trial_id, reason }),
            _ => Ok(trial),
        }
    }

    /// Persist a classified outcome.
    fn finish(&self, trial: &Trial, outcome: &Outcome) -> Result<()> {
        let trial_id = trial.id();
        match outcome {
            Outcome::Complete(value) => {
                trial.report_final(*value)?;
                self.storage
                    .set_trial_state(trial_id, TrialState::Complete)?;
                #[cfg(feature = "tracing")]
                self.log_completion(trial_id, *value);
            }
            Outcome::Pruned => {
                self.storage.set_trial_state(trial_id, TrialState::Pruned)?;
                trace_info!(trial_id, "trial pruned");
            }
            Outcome::Fail { reason } => {
                self.record_failure(trial_id, reason)?;
                trace_warn!(trial_id, %reason, "trial failed");
            }
            Outcome::Uncaught { reason } => {
                self.record_failure(trial_id, reason)?;
                trace_error!(trial_id, %reason, "objective raised an uncaught error");
            }
        }
        Ok(())
    }

    /// Store the reason, then close the trial as failed.
    fn record_failure(&self, trial_id: TrialId, reason: &str) -> Result<()> {
        self.storage
            .set_trial_system_attr(trial_id, FAIL_REASON_KEY, reason.into())?;
        self.storage.set_trial_state(trial_id, TrialState::Fail)
    }

    /// Fail the trial if it is still running. The error that led here is
    /// returned by the caller, so a second one is only logged.
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn close_unfinished(&self, trial_id: TrialId, reason: &str) {
        match self.storage.get_trial(trial_id) {
            Ok(trial) if trial.state == TrialState::Running => {
                if let Err(e) = self.record_failure(trial_id, reason) {
                    trace_error!(trial_id, error = %e, "trial left running");
                } else {
                    trace_error!(trial_id, %reason, "trial failed while recording its outcome");
                }
            }
            Ok(_) => {}
            Err(e) => {
                trace_error!(trial_id, error = %e, "trial state unavailable");
            }
        }
    }

    #[cfg(feature = "tracing")]
    fn log_completion(&self, trial_id: TrialId, value: f64) {
        match self.storage.get_best_trial(self.study_id()) {
            Ok(best) => tracing::info!(
                trial_id,
                value,
                best_trial = best.trial_id,
                best_value = ?best.value,
                best_params = ?best.params,
                "trial finished"
            ),
            Err(e) => tracing::warn!(trial_id, value, error = %e, "trial finished; best trial unavailable"),
        }
    }
}
