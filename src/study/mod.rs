//! Study implementation: construction, attribute access, and the
//! optimization entry points.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::frozen::{FrozenTrial, StudySummary};
use crate::pruner::{MedianPruner, Pruner};
use crate::sampler::{RandomSampler, Sampler};
use crate::storage::Storage;
use crate::trial::AttrValue;
use crate::types::{Direction, StudyId};

mod analysis;
mod builder;
mod export;
mod optimize;
mod parallel;
mod runner;

pub use builder::StudyBuilder;
pub use export::{Cell, Column, InnerKey, TrialsTable};
pub use optimize::{OptimizeOptions, Parallelism};

/// A study runs trials of an objective and records them in a storage
/// backend.
///
/// The study itself owns no trial data: every trial, its parameters, and
/// its attributes live in [`Storage`], so several `Study` handles attached
/// to the same record observe the same history.
///
/// # Examples
///
/// ```
/// use trialrun::{Direction, Study};
///
/// let study = Study::builder().study_name("quadratic").build().unwrap();
/// assert_eq!(study.study_name(), "quadratic");
/// assert_eq!(study.direction(), Direction::Minimize);
/// ```
pub struct Study {
    study_name: String,
    study_id: StudyId,
    direction: Direction,
    pub(crate) sampler: Arc<dyn Sampler>,
    pub(crate) pruner: Arc<dyn Pruner>,
    pub(crate) storage: Arc<dyn Storage>,
}

impl fmt::Debug for Study {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Study")
            .field("study_name", &self.study_name)
            .field("study_id", &self.study_id)
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

impl Study {
    /// Return a [`StudyBuilder`] for constructing a study with a fluent API.
    #[must_use]
    pub fn builder() -> StudyBuilder {
        StudyBuilder::new()
    }

    /// Attach to an existing study by name, with the default sampler and
    /// pruner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] if no study has that name, and
    /// [`Error::UnsupportedDirection`] if the stored study maximizes.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use trialrun::Study;
    /// use trialrun::storage::InMemoryStorage;
    ///
    /// let storage = Arc::new(InMemoryStorage::new());
    /// Study::builder()
    ///     .study_name("shared")
    ///     .storage(storage.clone())
    ///     .build()
    ///     .unwrap();
    ///
    /// let again = Study::load("shared", storage).unwrap();
    /// assert_eq!(again.study_name(), "shared");
    /// ```
    pub fn load(study_name: &str, storage: Arc<dyn Storage>) -> Result<Self> {
        let study_id = storage.get_study_id_from_name(study_name)?;
        Self::attach(
            study_id,
            storage,
            Arc::new(RandomSampler::new()),
            Arc::new(MedianPruner::new()),
        )
    }

    /// Bind to `study_id`, reading its name and direction from `storage`.
    pub(crate) fn attach(
        study_id: StudyId,
        storage: Arc<dyn Storage>,
        sampler: Arc<dyn Sampler>,
        pruner: Arc<dyn Pruner>,
    ) -> Result<Self> {
        let study_name = storage.get_study_name_from_id(study_id)?;
        let direction = storage.get_study_direction(study_id)?;
        if direction == Direction::Maximize {
            return Err(Error::UnsupportedDirection { study_name });
        }
        Ok(Self {
            study_name,
            study_id,
            direction,
            sampler,
            pruner,
            storage,
        })
    }

    /// Return the study's name.
    #[must_use]
    pub fn study_name(&self) -> &str {
        &self.study_name
    }

    /// Return the study's id in its storage backend.
    #[must_use]
    pub fn study_id(&self) -> StudyId {
        self.study_id
    }

    /// Return the optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Return the storage backend.
    #[must_use]
    pub fn storage(&self) -> &dyn Storage {
        &*self.storage
    }

    /// Return all trials of this study, in allocation order.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn trials(&self) -> Result<Vec<FrozenTrial>> {
        self.storage.get_all_trials(self.study_id)
    }

    /// Return the study's user attributes.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn user_attrs(&self) -> Result<HashMap<String, AttrValue>> {
        self.storage.get_study_user_attrs(self.study_id)
    }

    /// Return the study's system attributes.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn system_attrs(&self) -> Result<HashMap<String, AttrValue>> {
        self.storage.get_study_system_attrs(self.study_id)
    }

    /// Set a user attribute on the study.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    ///
    /// # Examples
    ///
    /// ```
    /// use trialrun::{AttrValue, Study};
    ///
    /// let study = Study::builder().build().unwrap();
    /// study.set_user_attr("dataset", "mnist").unwrap();
    /// assert_eq!(
    ///     study.user_attrs().unwrap()["dataset"],
    ///     AttrValue::String("mnist".into())
    /// );
    /// ```
    pub fn set_user_attr(&self, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        self.storage
            .set_study_user_attr(self.study_id, key, value.into())
    }

    /// Set a system attribute on the study.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn set_system_attr(&self, key: &str, value: impl Into<AttrValue>) -> Result<()> {
        self.storage
            .set_study_system_attr(self.study_id, key, value.into())
    }
}

/// Create a new study record and attach to it.
///
/// `direction` must be `"minimize"`; `"maximize"` parses but is rejected
/// before the record is created.  With `study_name` unset, the storage
/// generates a unique name.  Unset collaborators fall back to
/// [`InMemoryStorage`](crate::storage::InMemoryStorage),
/// [`RandomSampler`], and [`MedianPruner`].
///
/// # Errors
///
/// Returns [`Error::InvalidDirection`], [`Error::UnsupportedDirection`],
/// or [`Error::DuplicateStudyName`].
///
/// # Examples
///
/// ```
/// use trialrun::{Error, create_study};
///
/// let study = create_study(None, None, None, Some("demo"), "minimize").unwrap();
/// assert_eq!(study.study_name(), "demo");
///
/// let err = create_study(None, None, None, None, "maximize").unwrap_err();
/// assert!(matches!(err, Error::UnsupportedDirection { .. }));
/// ```
pub fn create_study(
    storage: Option<Arc<dyn Storage>>,
    sampler: Option<Arc<dyn Sampler>>,
    pruner: Option<Arc<dyn Pruner>>,
    study_name: Option<&str>,
    direction: &str,
) -> Result<Study> {
    let mut builder = Study::builder().direction(direction.parse()?);
    if let Some(storage) = storage {
        builder = builder.storage(storage);
    }
    if let Some(sampler) = sampler {
        builder = builder.shared_sampler(sampler);
    }
    if let Some(pruner) = pruner {
        builder = builder.shared_pruner(pruner);
    }
    if let Some(name) = study_name {
        builder = builder.study_name(name);
    }
    builder.build()
}

/// Summaries of every study recorded in `storage`.
///
/// # Errors
///
/// Returns a storage error.
pub fn get_all_study_summaries(storage: &dyn Storage) -> Result<Vec<StudySummary>> {
    storage.get_all_study_summaries()
}
