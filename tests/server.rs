mod common;

use std::sync::Arc;

use amr_predict::error::LoadError;
use amr_predict::parsing::store::{LoadFailure, LoadReport};
use amr_predict::predict::{Dispatcher, ObservationInput};
use amr_predict::registry::Registry;
use amr_predict::server::{self, AppState};
use axum::extract::{Json, State};
use common::{entry, mapping, AllSet, Constant};
use serde_json::json;

fn state(report: &LoadReport) -> AppState {
    let mut registry = Registry::new();
    registry.insert(entry(
        "amoxicillin_clavulanate",
        Box::new(AllSet { width: 2 }),
        &["species_Escherichia coli", "country_Kenya"],
    ));
    registry.insert(entry(
        "ceftriaxone",
        Box::new(AllSet { width: 3 }),
        &["species_Escherichia coli", "country_Kenya"],
    ));
    registry.insert(entry(
        "gentamicin",
        Box::new(Constant { width: 1, class: 5 }),
        &["gender_Male"],
    ));

    AppState::new(Dispatcher::new(Arc::new(registry), Arc::new(mapping())), report)
}

#[tokio::test]
async fn predict_returns_one_result_per_antibiotic() {
    let input: ObservationInput = serde_json::from_value(json!({
        "species": "Escherichia coli",
        "country": "Kenya",
        "age": 42,
        "notes": null
    }))
    .expect("observation");

    let Json(response) = server::predict(State(state(&LoadReport::default())), Json(input)).await;

    assert_eq!(
        serde_json::to_value(&response).expect("serialise"),
        json!({
            "status": "success",
            "predictions": [
                {"antibiotic": "Amoxicillin Clavulanate", "prediction": "Resistant"},
                {"antibiotic": "Ceftriaxone", "prediction": "Error: feature shape mismatch, expected: 3, got 2"},
                {"antibiotic": "Gentamicin", "prediction": "Unknown"}
            ]
        })
    );
}

#[tokio::test]
async fn predict_accepts_an_empty_observation() {
    let Json(response) = server::predict(
        State(state(&LoadReport::default())),
        Json(ObservationInput::new()),
    )
    .await;

    assert_eq!(response.status, "success");
    assert_eq!(response.predictions.len(), 3);
    assert_eq!(response.predictions[0].prediction.render(), "Susceptible");
}

#[tokio::test]
async fn dropdowns_list_values_per_field() {
    let Json(dropdowns) = server::dropdowns(State(state(&LoadReport::default()))).await;

    assert_eq!(
        serde_json::to_value(&dropdowns).expect("serialise"),
        json!({
            "species_list": ["Escherichia coli", "Klebsiella pneumoniae"],
            "country_list": ["Kenya", "Uganda"],
            "gender_list": ["Female", "Male"]
        })
    );
}

#[tokio::test]
async fn models_include_load_failures() {
    let report = LoadReport {
        loaded: vec!["amoxicillin_clavulanate".to_string()],
        failures: vec![LoadFailure {
            antibiotic: "meropenem".to_string(),
            error: LoadError::MissingCompanion {
                path: "models/meropenem_label_mapping.json".into(),
            },
        }],
    };

    let Json(models) = server::models(State(state(&report))).await;

    let ids: Vec<&str> = models.models.iter().map(|model| model.id.as_str()).collect();
    assert_eq!(ids, vec!["amoxicillin_clavulanate", "ceftriaxone", "gentamicin"]);
    assert_eq!(models.models[0].antibiotic, "Amoxicillin Clavulanate");
    assert_eq!(models.models[0].labels, vec!["Susceptible", "Resistant"]);
    assert_eq!(models.models[1].n_features, 3);
    assert_eq!(models.models[1].n_columns, 2);
    assert_eq!(models.failures.len(), 1);
    assert_eq!(models.failures[0].antibiotic, "meropenem");
}

#[tokio::test]
async fn health_is_ok() {
    assert_eq!(server::health().await, "ok");
}
