mod common;

use std::fs;

use amr_predict::error::DatasetError;
use amr_predict::evaluate::{evaluate_store, write_report, Outcome};
use amr_predict::parsing::store::load_model_store;
use common::write_xgb_antibiotic;

const COLUMNS: [&str; 2] = ["species_Escherichia coli", "country_Kenya"];

#[test]
fn scores_models_against_stored_datasets() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_xgb_antibiotic(dir.path(), "ampicillin", &COLUMNS, &[(0, -1.0, 1.0)]);
    write_xgb_antibiotic(dir.path(), "gentamicin", &COLUMNS, &[(0, -1.0, 1.0)]);
    // Columns in a different order, plus one the model does not use
    fs::write(
        dir.path().join("ampicillin_feature_matrix.csv"),
        "country_Kenya,age,species_Escherichia coli\n1,30,1\n0,41,1\n1,52,0\n0,63,0\n",
    )
    .expect("write matrix");
    fs::write(
        dir.path().join("ampicillin_label_vector.csv"),
        "label\n1\n1\n1\n0\n",
    )
    .expect("write labels");

    let (registry, _) = load_model_store(dir.path()).expect("load store");
    let evaluations = evaluate_store(dir.path(), &registry);

    assert_eq!(evaluations.len(), 2);
    assert_eq!(evaluations[0].antibiotic, "ampicillin");
    match &evaluations[0].outcome {
        Outcome::Scored(score) => {
            assert_eq!(score.samples, 4);
            assert_eq!(score.mistakes, 1);
            assert!(score.missing_columns.is_empty());
        }
        other => panic!("expected a score, got {other:?}"),
    }
    assert!(matches!(
        evaluations[1].outcome,
        Outcome::Skipped(DatasetError::NotFound { .. })
    ));

    let report_path = dir.path().join("report.json");
    write_report(&report_path, &evaluations).expect("write report");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("read report"))
            .expect("report is JSON");

    assert_eq!(report[0]["antibiotic"], "ampicillin");
    assert_eq!(report[0]["status"], "scored");
    assert_eq!(report[0]["mistakes"], 1);
    assert_eq!(report[1]["status"], "skipped");
}
