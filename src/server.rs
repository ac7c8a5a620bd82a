use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::Method,
    routing::{get, post},
    Router,
};
use indexmap::IndexMap;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::parsing::store::LoadReport;
use crate::predict::{Dispatcher, ObservationInput, PredictionResult};
use crate::registry::Registry;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub predictions: Vec<PredictionResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub id: String,
    pub antibiotic: String,
    pub kind: &'static str,
    pub n_features: usize,
    pub n_columns: usize,
    /// Labels in class-index order
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureSummary {
    pub antibiotic: String,
    pub error: String,
}

/// Startup diagnostics for operators
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelSummary>,
    pub failures: Vec<FailureSummary>,
}

impl ModelsResponse {
    pub fn new(registry: &Registry, report: &LoadReport) -> ModelsResponse {
        let models = registry
            .iter()
            .map(|entry| ModelSummary {
                id: entry.antibiotic_id().to_string(),
                antibiotic: entry.display_name(),
                kind: entry.classifier().kind(),
                n_features: entry.classifier().n_features(),
                n_columns: entry.expected_columns().len(),
                labels: entry
                    .label_map()
                    .labels()
                    .map(|(_, label)| label.to_string())
                    .collect(),
            })
            .collect();
        let failures = report
            .failures
            .iter()
            .map(|failure| FailureSummary {
                antibiotic: failure.antibiotic.clone(),
                error: failure.error.to_string(),
            })
            .collect();

        ModelsResponse { models, failures }
    }
}

/// Shared, read-only state of all handlers
#[derive(Clone)]
pub struct AppState {
    dispatcher: Dispatcher,
    dropdowns: Arc<IndexMap<String, Vec<String>>>,
    models: Arc<ModelsResponse>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, report: &LoadReport) -> AppState {
        let dropdowns = Arc::new(dispatcher.mapping().dropdowns());
        let models = Arc::new(ModelsResponse::new(dispatcher.registry(), report));

        AppState {
            dispatcher,
            dropdowns,
            models,
        }
    }
}

/// `GET /health`, `GET /dropdowns`, `GET /models` and `POST /predict`
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/dropdowns", get(dropdowns))
        .route("/models", get(models))
        .route("/predict", post(predict))
        .layer(cors)
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn dropdowns(State(state): State<AppState>) -> Json<IndexMap<String, Vec<String>>> {
    Json(state.dropdowns.as_ref().clone())
}

pub async fn models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.models.as_ref().clone())
}

pub async fn predict(
    State(state): State<AppState>,
    Json(input): Json<ObservationInput>,
) -> Json<PredictResponse> {
    let predictions = state.dispatcher.predict(&input);

    Json(PredictResponse {
        status: "success",
        predictions,
    })
}
