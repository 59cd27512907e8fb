use crate::types::{StudyId, TrialId, TrialState};

/// Errors returned by studies, storage backends, and the trial engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a direction string is neither `minimize` nor `maximize`.
    #[error("invalid direction '{0}': expected 'minimize' or 'maximize'")]
    InvalidDirection(String),

    /// Returned when a study is constructed with a direction the engine cannot optimize.
    #[error(
        "optimization direction of study '{study_name}' is set to maximize; only minimize is supported"
    )]
    UnsupportedDirection {
        /// The name of the rejected study.
        study_name: String,
    },

    /// Returned when requesting the best trial but no trials have completed.
    #[error("no completed trials available")]
    NoCompletedTrials,

    /// Returned when a trial is pruned (stopped early by the objective function).
    #[error("trial was pruned")]
    TrialPruned,

    /// Returned when a study name or id is unknown to the storage backend.
    #[error("study not found: {0}")]
    StudyNotFound(String),

    /// Returned when creating a study whose name is already taken.
    #[error("study name '{0}' already exists")]
    DuplicateStudyName(String),

    /// Returned when a trial id is unknown to the storage backend.
    #[error("trial not found: {0}")]
    TrialNotFound(TrialId),

    /// Returned when a finished trial is asked to transition again.
    #[error("trial {trial_id} has already finished with state {state}")]
    TrialAlreadyFinished {
        /// The trial that was already finished.
        trial_id: TrialId,
        /// Its recorded terminal state.
        state: TrialState,
    },

    /// Returned when a distribution is malformed (empty range, bad step, no choices).
    #[error("invalid distribution for '{name}': {reason}")]
    InvalidDistribution {
        /// The name of the parameter.
        name: String,
        /// Why the distribution was rejected.
        reason: String,
    },

    /// Returned when a parameter is suggested with a different distribution than before.
    #[error("parameter conflict for '{name}': {reason}")]
    ParameterConflict {
        /// The name of the conflicting parameter.
        name: String,
        /// The reason for the conflict.
        reason: String,
    },

    /// Returned when an explicit worker count of zero is requested.
    #[error("invalid job count {0}: use a positive count or -1 for all cores")]
    InvalidJobCount(i64),

    /// Returned when the objective raised an error outside the catch filter.
    #[error("trial {trial_id} failed with an uncaught error: {reason}")]
    ObjectiveFailed {
        /// The trial whose objective failed.
        trial_id: TrialId,
        /// The formatted error.
        reason: String,
    },

    /// Returned when the objective panicked.
    #[error("trial {trial_id} panicked: {reason}")]
    ObjectivePanicked {
        /// The trial whose objective panicked.
        trial_id: TrialId,
        /// The panic payload, when it was a string.
        reason: String,
    },

    /// Returned when recording a trial's outcome panicked.
    #[error("recording the outcome of trial {trial_id} panicked: {reason}")]
    RecordPanicked {
        /// The trial being recorded.
        trial_id: TrialId,
        /// The panic payload, when it was a string.
        reason: String,
    },

    /// Returned when a worker thread panicked outside of an objective call.
    #[error("worker {worker} panicked: {reason}")]
    WorkerPanicked {
        /// The index of the worker.
        worker: usize,
        /// The panic payload, when it was a string.
        reason: String,
    },

    /// Returned when a study id does not resolve in the storage backend.
    #[error("unknown study id {0}")]
    UnknownStudyId(StudyId),
}

/// Convenience alias for results produced by this crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Convenience type for signalling a pruned trial from an objective function.
///
/// Implements `Into<Error>` so it can be used with `?` in objectives that
/// return `Result<V, Error>`.
///
/// # Examples
///
/// ```
/// use trialrun::{Error, TrialPruned};
///
/// fn objective_that_prunes() -> Result<f64, Error> {
///     // ... some computation ...
///     Err(TrialPruned)?
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialPruned;

impl core::fmt::Display for TrialPruned {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "trial was pruned")
    }
}

impl core::error::Error for TrialPruned {}

impl From<TrialPruned> for Error {
    fn from(_: TrialPruned) -> Self {
        Error::TrialPruned
    }
}

/// Render a panic payload captured by `catch_unwind` or `JoinHandle::join`.
pub(crate) fn panic_message(payload: &(dyn core::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
