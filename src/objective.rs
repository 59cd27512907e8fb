//! The [`Objective`] trait defines what gets optimized.
//!
//! Closures with the signature `Fn(&mut Trial) -> Result<T, E>` implement
//! [`Objective`] through a blanket impl, so most callers pass them straight
//! to [`Study::optimize`](crate::Study::optimize):
//!
//! ```
//! use trialrun::prelude::*;
//!
//! let study = Study::builder().build().unwrap();
//! study
//!     .optimize_n(20, |trial: &mut Trial| {
//!         let x = trial.suggest_uniform("x", -10.0, 10.0)?;
//!         Ok::<_, Error>((x - 3.0).powi(2))
//!     })
//!     .unwrap();
//! assert!(study.best_value().unwrap() >= 0.0);
//! ```
//!
//! Implement the trait on a struct when the objective carries state:
//!
//! ```
//! use trialrun::prelude::*;
//!
//! struct Shifted {
//!     offset: f64,
//! }
//!
//! impl Objective for Shifted {
//!     type Output = f64;
//!     type Error = Error;
//!
//!     fn evaluate(&self, trial: &mut Trial) -> Result<f64> {
//!         let x = trial.suggest_uniform("x", -1.0, 1.0)?;
//!         Ok(x * x + self.offset)
//!     }
//! }
//!
//! let study = Study::builder().build().unwrap();
//! study.optimize_n(5, Shifted { offset: 1.0 }).unwrap();
//! assert!(study.best_value().unwrap() >= 1.0);
//! ```

use core::fmt;

use crate::trial::Trial;

/// A function evaluated once per trial.
///
/// The returned value is converted to `f64` through [`ObjectiveValue`].
/// Returning [`TrialPruned`](crate::TrialPruned) or
/// [`Error::TrialPruned`](crate::Error::TrialPruned) marks the trial as
/// pruned; any other error is matched against the run's [`Catch`] filter.
///
/// Parallel runs share one objective across worker threads, so
/// [`Study::optimize`](crate::Study::optimize) additionally requires `Sync`.
pub trait Objective {
    /// The value returned on success.
    type Output: ObjectiveValue;

    /// The error type returned by [`evaluate`](Objective::evaluate).
    type Error: fmt::Display + fmt::Debug + 'static;

    /// Evaluate the objective for a single trial.
    ///
    /// # Errors
    ///
    /// Any error of type [`Self::Error`](Objective::Error).
    fn evaluate(&self, trial: &mut Trial) -> Result<Self::Output, Self::Error>;
}

impl<F, T, E> Objective for F
where
    F: Fn(&mut Trial) -> Result<T, E>,
    T: ObjectiveValue,
    E: fmt::Display + fmt::Debug + 'static,
{
    type Output = T;
    type Error = E;

    fn evaluate(&self, trial: &mut Trial) -> Result<T, E> {
        self(trial)
    }
}

/// A value an objective may return, convertible to the `f64` a study
/// minimizes.
///
/// A conversion failure (`None`) fails the trial; the value's `Debug`
/// rendering ends up in the trial's `fail_reason`.
pub trait ObjectiveValue: fmt::Debug {
    /// Convert to `f64`, or `None` if the value has no numeric meaning.
    fn to_f64(&self) -> Option<f64>;
}

impl ObjectiveValue for f64 {
    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

impl ObjectiveValue for f32 {
    fn to_f64(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

macro_rules! lossless_int_value {
    ($($t:ty),*) => {
        $(
            impl ObjectiveValue for $t {
                fn to_f64(&self) -> Option<f64> {
                    Some(f64::from(*self))
                }
            }
        )*
    };
}

lossless_int_value!(i8, i16, i32, u8, u16, u32);

macro_rules! wide_int_value {
    ($($t:ty),*) => {
        $(
            impl ObjectiveValue for $t {
                #[allow(clippy::cast_precision_loss)]
                fn to_f64(&self) -> Option<f64> {
                    Some(*self as f64)
                }
            }
        )*
    };
}

wide_int_value!(i64, u64, isize, usize);

impl ObjectiveValue for bool {
    fn to_f64(&self) -> Option<f64> {
        Some(if *self { 1.0 } else { 0.0 })
    }
}

impl ObjectiveValue for String {
    fn to_f64(&self) -> Option<f64> {
        self.as_str().to_f64()
    }
}

impl ObjectiveValue for &str {
    fn to_f64(&self) -> Option<f64> {
        self.trim().parse().ok()
    }
}

impl<T: ObjectiveValue> ObjectiveValue for Option<T> {
    fn to_f64(&self) -> Option<f64> {
        self.as_ref().and_then(ObjectiveValue::to_f64)
    }
}

/// Which objective errors are recorded as failed trials.
///
/// Errors accepted by the filter fail the trial and the run continues.
/// Errors rejected by it are fatal: the trial is recorded as failed and
/// [`Study::optimize`](crate::Study::optimize) returns
/// [`Error::ObjectiveFailed`](crate::Error::ObjectiveFailed).
///
/// # Examples
///
/// ```
/// use trialrun::Catch;
///
/// #[derive(Debug)]
/// enum SimError {
///     Diverged,
///     Io(String),
/// }
///
/// // Diverging simulations fail the trial; I/O errors abort the run.
/// let catch = Catch::when(|e: &SimError| matches!(e, SimError::Diverged));
/// assert!(catch.matches(&SimError::Diverged));
/// assert!(!catch.matches(&SimError::Io("disk full".into())));
/// ```
pub struct Catch<E> {
    filter: Filter<E>,
}

type Predicate<E> = Box<dyn Fn(&E) -> bool + Send + Sync>;

enum Filter<E> {
    All,
    Nothing,
    When(Predicate<E>),
}

impl<E> Catch<E> {
    /// Record every error as a failed trial.
    #[must_use]
    pub fn all() -> Self {
        Self {
            filter: Filter::All,
        }
    }

    /// Treat every error as fatal.
    #[must_use]
    pub fn none() -> Self {
        Self {
            filter: Filter::Nothing,
        }
    }

    /// Record errors matching `predicate` as failed trials; others are fatal.
    #[must_use]
    pub fn when(predicate: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self {
            filter: Filter::When(Box::new(predicate)),
        }
    }

    /// Returns `true` if `error` is recorded as a failed trial.
    #[must_use]
    pub fn matches(&self, error: &E) -> bool {
        match &self.filter {
            Filter::All => true,
            Filter::Nothing => false,
            Filter::When(predicate) => predicate(error),
        }
    }
}

impl<E> Default for Catch<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E> fmt::Debug for Catch<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.filter {
            Filter::All => "all",
            Filter::Nothing => "none",
            Filter::When(_) => "when(..)",
        };
        write!(f, "Catch::{name}")
    }
}
