use std::fs;

use trialrun::{Cell, Error, InnerKey, ParamValue, Study, Trial, TrialState};

fn scratch_path(ext: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("trialrun-{}.{ext}", uuid::Uuid::new_v4()))
}

fn small_study() -> Study {
    let study = Study::builder().study_name("export").build().unwrap();
    study
        .optimize_n(3, |trial: &mut Trial| -> Result<f64, Error> {
            let x = trial.suggest_int("x", 1, 1)?;
            if trial.id() == 1 {
                trial.set_user_attr("note", "second, with comma")?;
                trial.report(4.0, Some(2))?;
            }
            Ok(x as f64)
        })
        .unwrap();
    study
}

#[test]
fn table_has_one_row_per_trial_and_map_columns() {
    let study = small_study();
    let table = study.trials_table().unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(
        table.get(0, "params", "x"),
        Some(&Cell::Param(ParamValue::Int(1)))
    );
    assert_eq!(table.get(0, "state", ""), Some(&Cell::State(TrialState::Complete)));
    assert_eq!(table.get(0, "user_attrs", "note"), Some(&Cell::Empty));
    assert_eq!(
        table.get(1, "intermediate_values", "2"),
        Some(&Cell::Float(4.0))
    );
    assert!(table.column("params_in_internal_repr", "x").is_none());

    let fields: Vec<_> = table.columns().iter().map(|c| c.field).collect();
    assert_eq!(fields.first(), Some(&"trial_id"));
    let steps: Vec<_> = table
        .columns()
        .iter()
        .filter(|c| c.field == "intermediate_values")
        .map(|c| c.key.clone())
        .collect();
    assert_eq!(steps, vec![InnerKey::Step(0), InnerKey::Step(2), InnerKey::Step(3)]);
}

#[test]
fn csv_export_writes_two_header_rows() {
    let study = small_study();
    let path = scratch_path("csv");
    study.export_csv(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2 + 3);
    assert!(lines[0].starts_with("trial_id,state,value"));
    assert!(lines[1].starts_with(",,"));
    assert!(lines[1].contains(",x,"));
    assert!(text.contains("\"second, with comma\""));
}

#[test]
fn empty_study_exports_empty_headers() {
    let study = Study::builder().build().unwrap();
    let table = study.trials_table().unwrap();
    assert!(table.is_empty());
    assert!(table.columns().is_empty());

    let mut out = Vec::new();
    table.to_csv(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "\n\n");
}

#[cfg(feature = "serde")]
#[test]
fn json_export_lists_every_trial() {
    let study = small_study();
    let path = scratch_path("json");
    study.export_json(&path).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert!(text.trim_start().starts_with('['));
    assert_eq!(text.matches("\"trial_id\"").count(), 3);
    assert!(text.contains("second, with comma"));
}
