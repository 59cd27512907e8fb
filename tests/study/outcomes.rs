use core::fmt;

use trialrun::{Catch, Error, OptimizeOptions, Study, Trial, TrialPruned, TrialState};

fn single_trial<T, E>(objective: impl Fn(&mut Trial) -> Result<T, E> + Sync) -> trialrun::FrozenTrial
where
    T: trialrun::ObjectiveValue,
    E: fmt::Display + fmt::Debug + 'static,
{
    let study = Study::builder().build().unwrap();
    study.optimize_n(1, objective).unwrap();
    study.trials().unwrap().remove(0)
}

#[derive(Debug)]
enum SimError {
    Diverged,
    Io,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Diverged => f.write_str("simulation diverged"),
            SimError::Io => f.write_str("i/o error"),
        }
    }
}

#[test]
fn pruning_marker_prunes_the_trial() {
    let trial = single_trial(|trial: &mut Trial| -> Result<f64, Error> {
        trial.report(3.0, Some(0))?;
        Err(TrialPruned)?
    });
    assert_eq!(trial.state, TrialState::Pruned);
    assert_eq!(trial.value, None);
    assert_eq!(trial.intermediate_values.get(&0), Some(&3.0));
    assert_eq!(trial.fail_reason(), None);
}

#[test]
fn pruning_error_variant_prunes_the_trial() {
    let trial = single_trial(|_: &mut Trial| Err::<f64, _>(Error::TrialPruned));
    assert_eq!(trial.state, TrialState::Pruned);
}

#[test]
fn pruning_marker_as_error_type_prunes_the_trial() {
    let trial = single_trial(|_: &mut Trial| Err::<f64, _>(TrialPruned));
    assert_eq!(trial.state, TrialState::Pruned);
}

#[test]
fn caught_error_records_its_description() {
    let trial = single_trial(|_: &mut Trial| Err::<f64, _>(SimError::Diverged));
    assert_eq!(trial.state, TrialState::Fail);
    assert_eq!(trial.value, None);
    let reason = trial.fail_reason().unwrap();
    assert!(reason.contains("simulation diverged"), "{reason}");
    assert!(reason.contains("FAIL"), "{reason}");
}

#[test]
fn catch_filter_selects_recoverable_errors() {
    let study = Study::builder().build().unwrap();
    let only_divergence = || Catch::when(|e: &SimError| matches!(e, SimError::Diverged));

    study
        .optimize(
            |_: &mut Trial| Err::<f64, _>(SimError::Diverged),
            OptimizeOptions::new().n_trials(2).catch(only_divergence()),
        )
        .unwrap();

    let result = study.optimize(
        |_: &mut Trial| Err::<f64, _>(SimError::Io),
        OptimizeOptions::new().n_trials(2).catch(only_divergence()),
    );
    assert!(matches!(result, Err(Error::ObjectiveFailed { .. })));

    let trials = study.trials().unwrap();
    assert_eq!(trials.len(), 3);
    assert!(trials.iter().all(|t| t.state == TrialState::Fail));
    assert!(trials[2].fail_reason().unwrap().contains("i/o error"));
}

#[test]
fn non_numeric_value_fails() {
    let trial = single_trial(|_: &mut Trial| Ok::<_, Error>("not a number"));
    assert_eq!(trial.state, TrialState::Fail);
    assert!(trial.fail_reason().unwrap().contains("not a number"));

    let trial = single_trial(|_: &mut Trial| Ok::<Option<f64>, Error>(None));
    assert_eq!(trial.state, TrialState::Fail);
}

#[test]
fn numeric_strings_complete() {
    let trial = single_trial(|_: &mut Trial| Ok::<_, Error>("2.5".to_string()));
    assert_eq!(trial.state, TrialState::Complete);
    assert_eq!(trial.value, Some(2.5));
}

#[test]
fn nan_fails() {
    let trial = single_trial(|_: &mut Trial| Ok::<_, Error>(f64::NAN));
    assert_eq!(trial.state, TrialState::Fail);
    assert_eq!(trial.value, None);
    assert!(trial.fail_reason().unwrap().contains("NaN"));
}

#[test]
fn infinity_completes() {
    let trial = single_trial(|_: &mut Trial| Ok::<_, Error>(f64::NEG_INFINITY));
    assert_eq!(trial.state, TrialState::Complete);
    assert_eq!(trial.value, Some(f64::NEG_INFINITY));
}

#[test]
fn integer_values_complete() {
    let trial = single_trial(|_: &mut Trial| Ok::<_, Error>(42_u32));
    assert_eq!(trial.value, Some(42.0));
}
