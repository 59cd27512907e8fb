use trialrun::distribution::Distribution;
use trialrun::{AttrValue, Error, ParamValue, Study, Trial, TrialState};

#[test]
fn trial_attributes_are_recorded() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |trial: &mut Trial| {
            trial.set_user_attr("score", 42.5)?;
            trial.set_user_attr("epoch", 7_i64)?;
            trial.set_user_attr("model", "resnet50")?;
            trial.set_system_attr("converged", true)?;
            assert_eq!(trial.user_attrs()?.len(), 3);
            assert_eq!(
                trial.system_attrs()?.get("converged"),
                Some(&AttrValue::Bool(true))
            );
            assert!(trial.datetime_start()?.is_some());
            Ok::<_, Error>(1.0)
        })
        .unwrap();

    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.user_attr("score"), Some(&AttrValue::Float(42.5)));
    assert_eq!(trial.user_attr("epoch"), Some(&AttrValue::Int(7)));
    assert_eq!(
        trial.user_attr("model"),
        Some(&AttrValue::String("resnet50".to_owned()))
    );
    assert_eq!(trial.system_attr("converged"), Some(&AttrValue::Bool(true)));
}

#[test]
fn study_attributes_round_trip_through_storage() {
    let study = Study::builder().build().unwrap();
    study.set_user_attr("dataset", "mnist").unwrap();
    study.set_system_attr("version", 3_i64).unwrap();

    assert_eq!(
        study.user_attrs().unwrap().get("dataset"),
        Some(&AttrValue::from("mnist"))
    );
    assert_eq!(
        study.system_attrs().unwrap().get("version"),
        Some(&AttrValue::Int(3))
    );
}

#[test]
fn repeated_suggestion_returns_the_first_value() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(3, |trial: &mut Trial| {
            let first = trial.suggest_uniform("x", 0.0, 1.0)?;
            let second = trial.suggest_uniform("x", 0.0, 1.0)?;
            assert_eq!(first.to_bits(), second.to_bits());
            Ok::<_, Error>(first)
        })
        .unwrap();

    for trial in study.trials().unwrap() {
        assert_eq!(trial.params.get("x"), trial.value.map(ParamValue::Float).as_ref());
    }
}

#[test]
fn conflicting_distribution_is_rejected() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |trial: &mut Trial| {
            trial.suggest_int("n", 0, 10)?;
            let err = trial.suggest_uniform("n", 0.0, 1.0).unwrap_err();
            assert!(matches!(err, Error::ParameterConflict { .. }));
            Ok::<_, Error>(0.0)
        })
        .unwrap();
}

#[test]
fn invalid_distribution_fails_the_trial() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(1, |trial: &mut Trial| {
            let x = trial.suggest_uniform("x", 1.0, 0.0)?;
            Ok::<_, Error>(x)
        })
        .unwrap();

    let trial = &study.trials().unwrap()[0];
    assert_eq!(trial.state, TrialState::Fail);
    assert!(trial.fail_reason().unwrap().contains("invalid distribution"));
}

#[test]
fn every_suggest_kind_stays_in_range() {
    let study = Study::builder().build().unwrap();
    study
        .optimize_n(20, |trial: &mut Trial| {
            let lr = trial.suggest_loguniform("lr", 1e-5, 1e-1)?;
            let dropout = trial.suggest_discrete_uniform("dropout", 0.0, 0.5, 0.1)?;
            let layers = trial.suggest_int("layers", 1, 4)?;
            let act = trial.suggest_categorical("act", &["relu", "tanh"])?;
            let fixed = trial.suggest("fixed", Distribution::IntUniform { low: 3, high: 3 })?;

            assert!((1e-5..=1e-1).contains(&lr));
            assert!((0.0..=0.5).contains(&dropout));
            assert!((1..=4).contains(&layers));
            assert!(matches!(act, ParamValue::Str(ref s) if s == "relu" || s == "tanh"));
            assert_eq!(fixed, ParamValue::Int(3));
            assert_eq!(trial.params()?.len(), 5);
            Ok::<_, Error>(lr)
        })
        .unwrap();
    assert_eq!(study.trials().unwrap().len(), 20);
}
