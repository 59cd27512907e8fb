use super::Pruner;
use crate::error::Result;
use crate::storage::Storage;
use crate::types::{StudyId, TrialId};

/// A pruner that never prunes.
pub struct NopPruner;

impl Pruner for NopPruner {
    fn prune(
        &self,
        _storage: &dyn Storage,
        _study_id: StudyId,
        _trial_id: TrialId,
        _step: u64,
    ) -> Result<bool> {
        Ok(false)
    }
}
