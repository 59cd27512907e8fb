use trialrun::prelude::*;

use crate::report_and_check;

#[test]
fn nop_pruner_lets_every_trial_finish() {
    let study = Study::builder().pruner(NopPruner).build().unwrap();
    study
        .optimize_n(6, |trial: &mut Trial| {
            let value = if trial.id() % 2 == 0 { 100.0 } else { 0.0 };
            report_and_check(trial, value, 3)
        })
        .unwrap();

    let trials = study.trials().unwrap();
    assert!(trials.iter().all(|t| t.state == TrialState::Complete));
    assert!(trials.iter().all(|t| t.intermediate_values.len() == 4));
}
