use core::fmt;
use core::time::Duration;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::objective::{Catch, Objective};

use super::Study;

/// How many worker threads run trials.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// A fixed number of workers. `Workers(1)` runs on the calling thread.
    Workers(usize),
    /// One worker per logical CPU.
    AllCores,
}

impl Parallelism {
    /// Interpret a job count: `-1` means all cores, positive counts are
    /// taken as given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJobCount`] for zero and for negative counts
    /// other than `-1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use trialrun::Parallelism;
    ///
    /// assert_eq!(Parallelism::from_n_jobs(-1).unwrap(), Parallelism::AllCores);
    /// assert_eq!(Parallelism::from_n_jobs(4).unwrap(), Parallelism::Workers(4));
    /// assert!(Parallelism::from_n_jobs(0).is_err());
    /// ```
    pub fn from_n_jobs(n_jobs: i64) -> Result<Self> {
        match n_jobs {
            -1 => Ok(Self::AllCores),
            n if n >= 1 => usize::try_from(n)
                .map(Self::Workers)
                .map_err(|_| Error::InvalidJobCount(n)),
            n => Err(Error::InvalidJobCount(n)),
        }
    }

    /// Resolve to a concrete worker count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJobCount`] for `Workers(0)`.
    pub fn resolve(self) -> Result<usize> {
        match self {
            Self::AllCores => Ok(num_cpus::get()),
            Self::Workers(0) => Err(Error::InvalidJobCount(0)),
            Self::Workers(n) => Ok(n),
        }
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::Workers(1)
    }
}

/// Options for a single [`Study::optimize`] run.
///
/// With neither a trial limit nor a timeout, the run continues until the
/// objective raises a fatal error.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use trialrun::{Catch, OptimizeOptions, Parallelism};
///
/// let options: OptimizeOptions<trialrun::Error> = OptimizeOptions::new()
///     .n_trials(100)
///     .timeout(Duration::from_secs(60))
///     .parallelism(Parallelism::AllCores)
///     .catch(Catch::none());
/// ```
pub struct OptimizeOptions<E = Error> {
    pub(super) n_trials: Option<usize>,
    pub(super) timeout: Option<Duration>,
    pub(super) parallelism: Parallelism,
    pub(super) catch: Catch<E>,
    pub(super) poll_interval: Duration,
}

impl<E> OptimizeOptions<E> {
    /// Sequential, unlimited, catching every error.
    #[must_use]
    pub fn new() -> Self {
        Self {
            n_trials: None,
            timeout: None,
            parallelism: Parallelism::default(),
            catch: Catch::all(),
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Stop after this many trials.
    #[must_use]
    pub fn n_trials(mut self, n_trials: usize) -> Self {
        self.n_trials = Some(n_trials);
        self
    }

    /// Stop admitting trials once this much time has passed.
    ///
    /// In-flight trials are never interrupted.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the worker count.
    #[must_use]
    pub fn parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set which objective errors fail a trial rather than abort the run.
    #[must_use]
    pub fn catch(mut self, catch: Catch<E>) -> Self {
        self.catch = catch;
        self
    }

    /// Upper bound on how long the parallel coordinator waits for a free
    /// queue slot before re-checking its stop conditions.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl<E> Default for OptimizeOptions<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for OptimizeOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizeOptions")
            .field("n_trials", &self.n_trials)
            .field("timeout", &self.timeout)
            .field("parallelism", &self.parallelism)
            .field("catch", &self.catch)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Study {
    /// Run the objective repeatedly and record every trial.
    ///
    /// One resolved worker runs trials on the calling thread; more spawn a
    /// worker pool. Trials that are pruned, fail with a caught error, or
    /// return an unusable value are recorded and the run continues.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJobCount`] for a zero worker count, and
    /// [`Error::ObjectiveFailed`] or [`Error::ObjectivePanicked`] when a
    /// trial fails fatally. The fatal trial is recorded as failed and no
    /// further trials start.
    ///
    /// # Examples
    ///
    /// ```
    /// use trialrun::{OptimizeOptions, Parallelism, Study, Trial};
    ///
    /// let study = Study::builder().build().unwrap();
    /// study
    ///     .optimize(
    ///         |trial: &mut Trial| {
    ///             let x = trial.suggest_uniform("x", -5.0, 5.0)?;
    ///             Ok::<_, trialrun::Error>(x * x)
    ///         },
    ///         OptimizeOptions::new()
    ///             .n_trials(8)
    ///             .parallelism(Parallelism::Workers(2)),
    ///     )
    ///     .unwrap();
    /// assert_eq!(study.trials().unwrap().len(), 8);
    /// ```
    #[allow(clippy::needless_pass_by_value)]
    pub fn optimize<O>(&self, objective: O, options: OptimizeOptions<O::Error>) -> Result<()>
    where
        O: Objective + Sync,
    {
        let workers = options.parallelism.resolve()?;

        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "optimize",
            study = %self.study_name(),
            n_trials = ?options.n_trials,
            timeout = ?options.timeout,
            workers,
        )
        .entered();

        if workers == 1 {
            self.optimize_sequential(&objective, &options)
        } else {
            self.optimize_parallel(&objective, workers, &options)
        }
    }

    /// Run exactly `n_trials` trials sequentially with default options.
    ///
    /// # Errors
    ///
    /// See [`optimize`](Self::optimize).
    pub fn optimize_n<O>(&self, n_trials: usize, objective: O) -> Result<()>
    where
        O: Objective + Sync,
    {
        self.optimize(objective, OptimizeOptions::new().n_trials(n_trials))
    }

    fn optimize_sequential<O>(&self, objective: &O, options: &OptimizeOptions<O::Error>) -> Result<()>
    where
        O: Objective,
    {
        let started = Instant::now();
        let mut i_trial = 0;
        loop {
            if options.n_trials.is_some_and(|n| i_trial >= n) {
                break;
            }
            if options.timeout.is_some_and(|t| started.elapsed() >= t) {
                trace_debug!(i_trial, "timeout reached");
                break;
            }
            i_trial += 1;
            self.run_trial(objective, &options.catch)?;
        }
        trace_debug!(n_trials = i_trial, "optimization finished");
        Ok(())
    }
}
