use std::collections::HashMap;
use std::sync::Arc;

use trialrun::distribution::Distribution;
use trialrun::storage::{InMemoryStorage, Storage};
use trialrun::{
    AttrValue, Direction, Error, FrozenTrial, OptimizeOptions, Parallelism, Result, Study,
    StudyId, StudySummary, Trial, TrialId, TrialPruned, TrialState,
};

use crate::count_state;

fn report_at_last_step(trial: &mut Trial) -> Result<f64> {
    trial.report(2.0, Some(u64::MAX))?;
    Ok(1.0)
}

#[test]
fn final_value_after_last_possible_step_sequential() {
    let study = Study::builder().build().unwrap();
    study.optimize_n(1, report_at_last_step).unwrap();

    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.state, TrialState::Complete);
    assert_eq!(trial.value, Some(1.0));
    assert_eq!(trial.intermediate_values.len(), 1);
    assert_eq!(trial.intermediate_values.get(&u64::MAX), Some(&2.0));
}

#[test]
fn final_value_after_last_possible_step_parallel() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(
            report_at_last_step,
            OptimizeOptions::new()
                .n_trials(4)
                .parallelism(Parallelism::Workers(2)),
        )
        .unwrap();

    let trials = study.trials().unwrap();
    assert_eq!(count_state(&trials, TrialState::Complete), 4);
    assert!(trials
        .iter()
        .all(|t| t.intermediate_values.get(&u64::MAX) == Some(&2.0)));
}

#[test]
fn provisional_value_is_dropped_when_pruned() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |trial: &mut Trial| -> Result<f64> {
            trial.report(3.0, None)?;
            Err(TrialPruned)?
        })
        .unwrap();

    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.state, TrialState::Pruned);
    assert_eq!(trial.value, None);
}

#[test]
fn provisional_value_is_dropped_when_failed() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |trial: &mut Trial| -> Result<f64> {
            trial.report(3.0, None)?;
            Ok(f64::NAN)
        })
        .unwrap();

    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.state, TrialState::Fail);
    assert_eq!(trial.value, None);
    assert!(matches!(study.best_trial(), Err(Error::NoCompletedTrials)));
}

#[derive(Clone, Copy)]
enum Fault {
    Error,
    Panic,
}

/// In-memory storage whose `Complete` transition breaks.
struct FaultyStorage {
    inner: InMemoryStorage,
    fault: Fault,
}

impl FaultyStorage {
    fn new(fault: Fault) -> Self {
        Self {
            inner: InMemoryStorage::new(),
            fault,
        }
    }
}

impl Storage for FaultyStorage {
    fn create_new_study_id(&self, study_name: Option<&str>) -> Result<StudyId> {
        self.inner.create_new_study_id(study_name)
    }

    fn get_study_id_from_name(&self, study_name: &str) -> Result<StudyId> {
        self.inner.get_study_id_from_name(study_name)
    }

    fn get_study_name_from_id(&self, study_id: StudyId) -> Result<String> {
        self.inner.get_study_name_from_id(study_id)
    }

    fn set_study_direction(&self, study_id: StudyId, direction: Direction) -> Result<()> {
        self.inner.set_study_direction(study_id, direction)
    }

    fn get_study_direction(&self, study_id: StudyId) -> Result<Direction> {
        self.inner.get_study_direction(study_id)
    }

    fn set_study_user_attr(&self, study_id: StudyId, key: &str, value: AttrValue) -> Result<()> {
        self.inner.set_study_user_attr(study_id, key, value)
    }

    fn set_study_system_attr(
        &self,
        study_id: StudyId,
        key: &str,
        value: AttrValue,
    ) -> Result<()> {
        self.inner.set_study_system_attr(study_id, key, value)
    }

    fn get_study_user_attrs(&self, study_id: StudyId) -> Result<HashMap<String, AttrValue>> {
        self.inner.get_study_user_attrs(study_id)
    }

    fn get_study_system_attrs(&self, study_id: StudyId) -> Result<HashMap<String, AttrValue>> {
        self.inner.get_study_system_attrs(study_id)
    }

    fn get_all_study_summaries(&self) -> Result<Vec<StudySummary>> {
        self.inner.get_all_study_summaries()
    }

    fn create_new_trial_id(&self, study_id: StudyId) -> Result<TrialId> {
        self.inner.create_new_trial_id(study_id)
    }

    fn set_trial_state(&self, trial_id: TrialId, state: TrialState) -> Result<()> {
        if state == TrialState::Complete {
            match self.fault {
                Fault::Error => return Err(Error::TrialNotFound(trial_id)),
                Fault::Panic => panic!("storage lost trial {trial_id}"),
            }
        }
        self.inner.set_trial_state(trial_id, state)
    }

    fn set_trial_value(&self, trial_id: TrialId, value: f64) -> Result<()> {
        self.inner.set_trial_value(trial_id, value)
    }

    fn set_trial_intermediate_value(
        &self,
        trial_id: TrialId,
        step: u64,
        value: f64,
    ) -> Result<()> {
        self.inner.set_trial_intermediate_value(trial_id, step, value)
    }

    fn set_trial_param(
        &self,
        trial_id: TrialId,
        name: &str,
        internal: f64,
        distribution: &Distribution,
    ) -> Result<bool> {
        self.inner
            .set_trial_param(trial_id, name, internal, distribution)
    }

    fn set_trial_user_attr(&self, trial_id: TrialId, key: &str, value: AttrValue) -> Result<()> {
        self.inner.set_trial_user_attr(trial_id, key, value)
    }

    fn set_trial_system_attr(
        &self,
        trial_id: TrialId,
        key: &str,
        value: AttrValue,
    ) -> Result<()> {
        self.inner.set_trial_system_attr(trial_id, key, value)
    }

    fn get_trial(&self, trial_id: TrialId) -> Result<FrozenTrial> {
        self.inner.get_trial(trial_id)
    }

    fn get_all_trials(&self, study_id: StudyId) -> Result<Vec<FrozenTrial>> {
        self.inner.get_all_trials(study_id)
    }
}

fn faulty_study(fault: Fault) -> Study {
    Study::builder()
        .storage(Arc::new(FaultyStorage::new(fault)))
        .build()
        .unwrap()
}

fn assert_closed_as_failed(trials: &[FrozenTrial]) {
    assert_eq!(count_state(trials, TrialState::Running), 0);
    assert!(count_state(trials, TrialState::Fail) >= 1);
    let failed = trials.iter().find(|t| t.state == TrialState::Fail).unwrap();
    assert_eq!(failed.value, None);
    assert!(failed.fail_reason().unwrap().contains("outcome"));
}

#[test]
fn storage_error_while_completing_fails_the_trial() {
    let study = faulty_study(Fault::Error);
    let result = study.optimize_n(3, |_: &mut Trial| Ok::<_, Error>(1.0));

    assert!(matches!(result, Err(Error::TrialNotFound(0))));
    let trials = study.trials().unwrap();
    assert_eq!(trials.len(), 1);
    assert_closed_as_failed(&trials);
}

#[test]
fn storage_panic_while_completing_fails_the_trial() {
    let study = faulty_study(Fault::Panic);
    let result = study.optimize_n(3, |_: &mut Trial| Ok::<_, Error>(1.0));

    let Err(Error::RecordPanicked { trial_id, reason }) = result else {
        panic!("expected RecordPanicked, got {result:?}");
    };
    assert_eq!(trial_id, 0);
    assert!(reason.contains("storage lost trial 0"));
    assert_closed_as_failed(&study.trials().unwrap());
}

#[test]
fn recording_faults_abort_parallel_runs_without_running_trials() {
    for fault in [Fault::Error, Fault::Panic] {
        let study = faulty_study(fault);
        let result = study.optimize(
            |_: &mut Trial| Ok::<_, Error>(1.0),
            OptimizeOptions::new()
                .n_trials(8)
                .parallelism(Parallelism::Workers(2)),
        );

        assert!(matches!(
            result,
            Err(Error::TrialNotFound(_) | Error::RecordPanicked { .. })
        ));
        assert_closed_as_failed(&study.trials().unwrap());
    }
}
