use core::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use trialrun::{Catch, Error, OptimizeOptions, Study, Trial, TrialState};

use crate::{count_state, study_with_storage};

#[test]
fn runs_exactly_n_trials() {
    for n in [0, 1, 7] {
        let study = Study::builder().build().unwrap();
        study
            .optimize_n(n, |trial: &mut Trial| {
                let x = trial.suggest_uniform("x", 0.0, 1.0)?;
                Ok::<_, Error>(x)
            })
            .unwrap();

        let trials = study.trials().unwrap();
        assert_eq!(trials.len(), n);
        assert_eq!(count_state(&trials, TrialState::Complete), n);
    }
}

#[test]
fn sequential_run_uses_no_worker_sessions() {
    let (study, storage) = study_with_storage();
    study
        .optimize_n(3, |_: &mut Trial| Ok::<_, Error>(1.0))
        .unwrap();
    assert_eq!(storage.sessions_acquired(), 0);
}

#[test]
fn timeout_stops_admission_without_interrupting_trials() {
    let study = Study::builder().build().unwrap();
    let started = Instant::now();
    study
        .optimize(
            |_: &mut Trial| {
                thread::sleep(Duration::from_millis(30));
                Ok::<_, Error>(1.0)
            },
            OptimizeOptions::new().timeout(Duration::from_millis(100)),
        )
        .unwrap();
    let elapsed = started.elapsed();

    let trials = study.trials().unwrap();
    assert!(!trials.is_empty());
    assert_eq!(count_state(&trials, TrialState::Complete), trials.len());
    // The last trial starts before the deadline and always finishes.
    assert!(elapsed >= Duration::from_millis(100));
    assert!(trials.len() <= 5, "ran {} trials", trials.len());
}

#[test]
fn zero_timeout_runs_nothing() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(
            |_: &mut Trial| Ok::<_, Error>(1.0),
            OptimizeOptions::new().timeout(Duration::ZERO),
        )
        .unwrap();
    assert!(study.trials().unwrap().is_empty());
}

#[test]
fn trial_limit_wins_over_timeout() {
    let study = Study::builder().build().unwrap();
    study
        .optimize(
            |_: &mut Trial| Ok::<_, Error>(1.0),
            OptimizeOptions::new()
                .n_trials(4)
                .timeout(Duration::from_secs(60)),
        )
        .unwrap();
    assert_eq!(study.trials().unwrap().len(), 4);
}

#[test]
fn final_value_is_stored_exactly_and_as_last_report() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |trial: &mut Trial| {
            trial.report(9.0, Some(0))?;
            trial.report(5.0, Some(3))?;
            Ok::<_, Error>(0.1 + 0.2)
        })
        .unwrap();

    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.state, TrialState::Complete);
    assert_eq!(trial.value.map(f64::to_bits), Some((0.1_f64 + 0.2).to_bits()));
    assert_eq!(trial.intermediate_values.get(&4), Some(&(0.1 + 0.2)));
    assert_eq!(trial.intermediate_values.len(), 3);
    assert!(trial.datetime_complete.is_some());
}

#[test]
fn final_value_without_reports_lands_at_step_zero() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |_: &mut Trial| Ok::<_, Error>(1.5))
        .unwrap();
    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.intermediate_values.get(&0), Some(&1.5));
}

#[test]
fn best_accessors_are_idempotent() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(10, |trial: &mut Trial| {
            let x = trial.suggest_uniform("x", -3.0, 3.0)?;
            Ok::<_, Error>(x * x)
        })
        .unwrap();

    let first = (study.best_value().unwrap(), study.best_params().unwrap());
    let second = (study.best_value().unwrap(), study.best_params().unwrap());
    assert_eq!(first, second);

    let min = study
        .trials()
        .unwrap()
        .iter()
        .filter_map(|t| t.value)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(first.0, min);
}

#[test]
fn uncaught_error_aborts_the_run() {
    let calls = AtomicUsize::new(0);
    let study = Study::builder().build().unwrap();
    let result = study.optimize(
        |_: &mut Trial| -> Result<f64, String> {
            if calls.fetch_add(1, Ordering::SeqCst) == 2 {
                Err("disk on fire".to_string())
            } else {
                Ok(1.0)
            }
        },
        OptimizeOptions::new().n_trials(10).catch(Catch::none()),
    );

    let trials = study.trials().unwrap();
    let Err(Error::ObjectiveFailed { trial_id, reason }) = result else {
        panic!("expected ObjectiveFailed, got {result:?}");
    };
    assert!(reason.contains("disk on fire"));
    assert_eq!(trials.len(), 3);
    assert_eq!(trial_id, trials[2].trial_id);
    assert_eq!(trials[2].state, TrialState::Fail);
    assert!(trials[2].fail_reason().unwrap().contains("disk on fire"));
    assert_eq!(count_state(&trials, TrialState::Running), 0);
}

#[test]
fn panicking_objective_is_recorded_and_reported() {
    let study = Study::builder().build().unwrap();
    let result = study.optimize_n(5, |_: &mut Trial| -> Result<f64, Error> {
        panic!("objective exploded");
    });

    let Err(Error::ObjectivePanicked { reason, .. }) = result else {
        panic!("expected ObjectivePanicked, got {result:?}");
    };
    assert!(reason.contains("objective exploded"));

    let trials = study.trials().unwrap();
    assert_eq!(trials.len(), 1);
    assert_eq!(trials[0].state, TrialState::Fail);
    assert!(trials[0].fail_reason().unwrap().contains("panicked"));
}
