use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, info_span, warn};

use crate::error::InferenceError;
use crate::parsing::mapping::EncoderMapping;
use crate::registry::{ModelEntry, Registry, UNKNOWN_LABEL};

pub mod features;

pub use features::{encode, FeatureRow};

/// Raw categorical fields of one clinical observation, in request order.
///
/// Any JSON value is accepted per field; only strings can match the encoder mapping.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ObservationInput {
    fields: IndexMap<String, serde_json::Value>,
}

impl ObservationInput {
    pub fn new() -> ObservationInput {
        ObservationInput::default()
    }

    /// Set `field` to a string value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> ObservationInput {
        self.fields
            .insert(field.into(), serde_json::Value::String(value.into()));
        self
    }

    /// `(field, value)` pairs whose value is a string.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .filter_map(|(field, value)| Some((field.as_str(), value.as_str()?)))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Outcome of one antibiotic model for one observation
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    /// The predicted class has a label.
    Label(String),
    /// The predicted class index is not in the label map.
    Unknown(usize),
    Failed(InferenceError),
}

impl Prediction {
    /// The string sent to clients: the label, `"Unknown"` or `"Error: {message}"`.
    pub fn render(&self) -> String {
        match self {
            Prediction::Label(label) => label.clone(),
            Prediction::Unknown(_) => UNKNOWN_LABEL.to_string(),
            Prediction::Failed(error) => format!("Error: {error}"),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Prediction::Failed(_))
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.render())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Display name, e.g. "Amoxicillin Clavulanate"
    pub antibiotic: String,
    pub prediction: Prediction,
}

/// Predicts every registered antibiotic for an observation.
///
/// Holds the registry and the encoder mapping read-only, so one dispatcher can
/// serve any number of concurrent requests.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    mapping: Arc<EncoderMapping>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, mapping: Arc<EncoderMapping>) -> Dispatcher {
        Dispatcher { registry, mapping }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn mapping(&self) -> &EncoderMapping {
        &self.mapping
    }

    /// One result per registered antibiotic, in registry order.
    ///
    /// A failing model only affects its own result.
    pub fn predict(&self, input: &ObservationInput) -> Vec<PredictionResult> {
        let span = info_span!("predict", fields = input.len(), models = self.registry.len());
        let _guard = span.enter();
        debug!(?input, "received observation");

        let results: Vec<PredictionResult> = self
            .registry
            .iter()
            .map(|entry| PredictionResult {
                antibiotic: entry.display_name(),
                prediction: self.predict_one(entry, input),
            })
            .collect();

        let failures = results.iter().filter(|r| r.prediction.is_failure()).count();
        if failures > 0 {
            warn!(failures, "some antibiotic models failed");
        }
        debug!(?results, "predictions");

        results
    }

    /// Predict a single antibiotic
    pub fn predict_one(&self, entry: &ModelEntry, input: &ObservationInput) -> Prediction {
        let row = encode(input, &self.mapping, entry);
        debug!(
            antibiotic = entry.antibiotic_id(),
            shape = ?row.as_matrix().dim(),
            "built feature row"
        );

        match classify(entry, &row) {
            Ok(class) => match entry.label_map().get(class) {
                Some(label) => Prediction::Label(label.to_string()),
                None => {
                    debug!(antibiotic = entry.antibiotic_id(), class, "class has no label");
                    Prediction::Unknown(class)
                }
            },
            Err(error) => {
                warn!(antibiotic = entry.antibiotic_id(), %error, "prediction failed");
                Prediction::Failed(error)
            }
        }
    }
}

fn classify(entry: &ModelEntry, row: &FeatureRow<'_>) -> Result<usize, InferenceError> {
    let classes = entry.classifier().predict(&row.as_matrix())?;

    classes.iter().next().copied().ok_or_else(|| {
        InferenceError::Predictor("classifier returned no prediction".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Classifier;
    use crate::registry::LabelMap;
    use ndarray::{Array1, ArrayView2};
    use std::path::Path;

    /// Returns no class at all
    struct Silent;

    impl Classifier for Silent {
        fn kind(&self) -> &'static str {
            "silent"
        }

        fn n_features(&self) -> usize {
            1
        }

        fn predict(&self, _inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError> {
            Ok(Array1::zeros(0))
        }
    }

    /// Predicts 1 when the single input is exactly the encoded weight
    struct Echo;

    impl Classifier for Echo {
        fn kind(&self) -> &'static str {
            "echo"
        }

        fn n_features(&self) -> usize {
            1
        }

        fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError> {
            Ok(inputs.column(0).mapv(|x| usize::from(x == 0.25)))
        }
    }

    fn dispatcher() -> Dispatcher {
        let mapping = EncoderMapping::parse(
            r#"{"specimen": {"urine": {"specimen_urine": 0.25}}}"#,
            Path::new("encoder_mapping.json"),
        )
        .unwrap();
        let labels = LabelMap::from_label_indices(vec![
            ("Susceptible".to_string(), 0),
            ("Resistant".to_string(), 1),
        ])
        .unwrap();

        let mut registry = Registry::new();
        registry.insert(ModelEntry::new(
            "amikacin",
            Box::new(Echo),
            vec!["specimen_urine".to_string()],
            labels.clone(),
        ));
        registry.insert(ModelEntry::new(
            "ceftazidime",
            Box::new(Silent),
            vec!["specimen_urine".to_string()],
            labels,
        ));

        Dispatcher::new(Arc::new(registry), Arc::new(mapping))
    }

    #[test]
    fn encoded_row_reaches_the_classifier_unchanged() {
        let dispatcher = dispatcher();
        let entry = dispatcher.registry().get("amikacin").unwrap();

        let prediction = dispatcher.predict_one(entry, &ObservationInput::new().with("specimen", "urine"));

        assert_eq!(prediction, Prediction::Label("Resistant".to_string()));
    }

    #[test]
    fn empty_classifier_output_is_a_failure() {
        let dispatcher = dispatcher();
        let entry = dispatcher.registry().get("ceftazidime").unwrap();

        let prediction = dispatcher.predict_one(entry, &ObservationInput::new());

        assert_eq!(
            prediction.render(),
            "Error: classifier returned no prediction"
        );
    }
}
