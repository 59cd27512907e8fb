use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pruner::{MedianPruner, Pruner};
use crate::sampler::{RandomSampler, Sampler};
use crate::storage::{InMemoryStorage, Storage};
use crate::types::Direction;

use super::Study;

/// A builder for constructing [`Study`] instances with a fluent API.
///
/// Created via [`Study::builder()`].
///
/// # Defaults
///
/// - Direction: [`Minimize`](Direction::Minimize)
/// - Sampler: [`RandomSampler`]
/// - Pruner: [`MedianPruner`]
/// - Storage: a fresh [`InMemoryStorage`]
/// - Name: generated by the storage
///
/// # Examples
///
/// ```
/// use trialrun::prelude::*;
///
/// let study = Study::builder()
///     .study_name("tuning")
///     .sampler(RandomSampler::with_seed(7))
///     .pruner(MedianPruner::new().n_warmup_steps(5))
///     .build()
///     .unwrap();
///
/// assert_eq!(study.study_name(), "tuning");
/// ```
pub struct StudyBuilder {
    study_name: Option<String>,
    direction: Direction,
    sampler: Option<Arc<dyn Sampler>>,
    pruner: Option<Arc<dyn Pruner>>,
    storage: Option<Arc<dyn Storage>>,
    load_if_exists: bool,
}

impl StudyBuilder {
    pub(super) fn new() -> Self {
        Self {
            study_name: None,
            direction: Direction::Minimize,
            sampler: None,
            pruner: None,
            storage: None,
            load_if_exists: false,
        }
    }

    /// Name the study. Names are unique within a storage backend.
    #[must_use]
    pub fn study_name(mut self, name: impl Into<String>) -> Self {
        self.study_name = Some(name.into());
        self
    }

    /// Set the optimization direction.
    ///
    /// Only [`Direction::Minimize`] is supported; [`build`](Self::build)
    /// rejects anything else.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Set the sampler used for parameter suggestions.
    #[must_use]
    pub fn sampler(self, sampler: impl Sampler + 'static) -> Self {
        self.shared_sampler(Arc::new(sampler))
    }

    /// Set a sampler that is shared with other studies.
    #[must_use]
    pub fn shared_sampler(mut self, sampler: Arc<dyn Sampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Set the pruner consulted by [`Trial::should_prune`](crate::Trial::should_prune).
    #[must_use]
    pub fn pruner(self, pruner: impl Pruner + 'static) -> Self {
        self.shared_pruner(Arc::new(pruner))
    }

    /// Set a pruner that is shared with other studies.
    #[must_use]
    pub fn shared_pruner(mut self, pruner: Arc<dyn Pruner>) -> Self {
        self.pruner = Some(pruner);
        self
    }

    /// Set the storage backend.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Attach to the named study if it already exists instead of failing
    /// with [`Error::DuplicateStudyName`].
    #[must_use]
    pub fn load_if_exists(mut self, load: bool) -> Self {
        self.load_if_exists = load;
        self
    }

    /// Build the [`Study`], creating its record in storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDirection`] for a maximizing study,
    /// checked before anything is written, and
    /// [`Error::DuplicateStudyName`] if the name is taken.
    pub fn build(self) -> Result<Study> {
        if self.direction == Direction::Maximize {
            return Err(Error::UnsupportedDirection {
                study_name: self.study_name.unwrap_or_default(),
            });
        }

        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        let sampler = self
            .sampler
            .unwrap_or_else(|| Arc::new(RandomSampler::new()));
        let pruner = self
            .pruner
            .unwrap_or_else(|| Arc::new(MedianPruner::new()));

        let name = self.study_name.as_deref();
        let study_id = match storage.create_new_study_id(name) {
            Ok(study_id) => {
                storage.set_study_direction(study_id, self.direction)?;
                study_id
            }
            Err(Error::DuplicateStudyName(existing)) if self.load_if_exists => {
                trace_info!(study_name = %existing, "using an existing study");
                storage.get_study_id_from_name(&existing)?
            }
            Err(e) => return Err(e),
        };

        Study::attach(study_id, storage, sampler, pruner)
    }
}
