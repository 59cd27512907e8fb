#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! A trial scheduling and execution engine for black-box minimization.
//!
//! A [`Study`] repeatedly evaluates a user objective, one [`Trial`] per
//! evaluation, on the calling thread or on a bounded pool of workers. Every
//! trial ends in exactly one terminal [`TrialState`] recorded in a
//! [`Storage`](storage::Storage) backend.
//!
//! # Getting Started
//!
//! ```
//! use trialrun::prelude::*;
//!
//! let study = Study::builder().study_name("quadratic").build().unwrap();
//! study
//!     .optimize(
//!         |trial: &mut Trial| {
//!             let x = trial.suggest_uniform("x", -10.0, 10.0)?;
//!             Ok::<_, Error>((x - 2.0).powi(2))
//!         },
//!         OptimizeOptions::new().n_trials(50).parallelism(Parallelism::Workers(4)),
//!     )
//!     .unwrap();
//!
//! let best = study.best_trial().unwrap();
//! println!("best value {:?} with {:?}", best.value, best.params);
//! ```
//!
//! # Trial outcomes
//!
//! | Objective result | Recorded state | Run continues |
//! |------------------|----------------|---------------|
//! | a value converting to a non-NaN `f64` | [`Complete`](TrialState::Complete) | yes |
//! | [`TrialPruned`] / [`Error::TrialPruned`] | [`Pruned`](TrialState::Pruned) | yes |
//! | an error accepted by the [`Catch`] filter | [`Fail`](TrialState::Fail) | yes |
//! | a NaN or non-numeric value | [`Fail`](TrialState::Fail) | yes |
//! | an error rejected by the filter, or a panic | [`Fail`](TrialState::Fail) | no, `optimize` returns the error |
//!
//! Failed trials carry their reason in the [`FAIL_REASON_KEY`] system
//! attribute.
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for every trial | on |
//! | `serde` | `Serialize`/`Deserialize` on records, [`Study::export_json`] | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! trace_error {
    ($($arg:tt)*) => { tracing::error!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_error {
    ($($arg:tt)*) => {};
}

pub mod distribution;
mod error;
mod frozen;
pub mod objective;
mod outcome;
mod param;
pub mod pruner;
pub mod sampler;
pub mod storage;
mod study;
mod trial;
mod types;

pub use error::{Error, Result, TrialPruned};
pub use frozen::{FAIL_REASON_KEY, FrozenTrial, StudySummary};
pub use objective::{Catch, Objective, ObjectiveValue};
pub use param::ParamValue;
pub use study::{
    Cell, Column, InnerKey, OptimizeOptions, Parallelism, Study, StudyBuilder, TrialsTable,
    create_study, get_all_study_summaries,
};
pub use trial::{AttrValue, Trial};
pub use types::{Direction, StudyId, TrialId, TrialState};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use trialrun::prelude::*;
/// ```
pub mod prelude {
    pub use crate::distribution::Distribution;
    pub use crate::error::{Error, Result, TrialPruned};
    pub use crate::objective::{Catch, Objective};
    pub use crate::param::ParamValue;
    pub use crate::pruner::{MedianPruner, NopPruner, Pruner};
    pub use crate::sampler::{RandomSampler, Sampler};
    pub use crate::storage::{InMemoryStorage, Storage};
    pub use crate::study::{OptimizeOptions, Parallelism, Study, StudyBuilder};
    pub use crate::trial::{AttrValue, Trial};
    pub use crate::types::{Direction, TrialState};
}
