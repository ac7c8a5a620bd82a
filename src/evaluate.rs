use json::{object, JsonValue};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{DatasetError, InferenceError};
use crate::parsing::dataset::parse_dataset;
use crate::parsing::Dataset;
use crate::registry::{ModelEntry, Registry};

/// Score of one model on its stored dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub samples: usize,
    pub mistakes: usize,
    /// Expected columns absent from the feature matrix (filled with zeros)
    pub missing_columns: Vec<String>,
}

impl Score {
    pub fn accuracy(&self) -> f64 {
        if self.samples == 0 {
            return 0f64;
        }

        1f64 - self.mistakes as f64 / self.samples as f64
    }
}

#[derive(Debug)]
pub enum Outcome {
    Scored(Score),
    /// No usable dataset for this antibiotic
    Skipped(DatasetError),
    Failed(InferenceError),
}

#[derive(Debug)]
pub struct Evaluation {
    pub antibiotic: String,
    pub outcome: Outcome,
}

/// Test the model on a dataset and count the mistakes
pub fn score_model(entry: &ModelEntry, dataset: &Dataset) -> Result<usize, InferenceError> {
    let predictions = entry.classifier().predict(&dataset.data.view())?;

    Ok(predictions
        .iter()
        .zip(dataset.target.iter())
        .filter(|(prediction, target)| prediction != target)
        .count())
}

/// Evaluate every registered model with the `{name}_feature_matrix.csv` and
/// `{name}_label_vector.csv` found in `dir`
pub fn evaluate_store(dir: &Path, registry: &Registry) -> Vec<Evaluation> {
    registry
        .iter()
        .map(|entry| {
            let antibiotic = entry.antibiotic_id().to_string();
            let outcome = evaluate_entry(dir, entry);

            match &outcome {
                Outcome::Scored(score) => info!(
                    antibiotic = %antibiotic,
                    samples = score.samples,
                    mistakes = score.mistakes,
                    "evaluated model"
                ),
                Outcome::Skipped(error) => warn!(antibiotic = %antibiotic, %error, "skipping evaluation"),
                Outcome::Failed(error) => warn!(antibiotic = %antibiotic, %error, "evaluation failed"),
            }

            Evaluation { antibiotic, outcome }
        })
        .collect()
}

fn evaluate_entry(dir: &Path, entry: &ModelEntry) -> Outcome {
    let (dataset, missing_columns) =
        match parse_dataset(dir, entry.antibiotic_id(), entry.expected_columns()) {
            Ok(parsed) => parsed,
            Err(error) => return Outcome::Skipped(error),
        };

    if !missing_columns.is_empty() {
        warn!(
            antibiotic = entry.antibiotic_id(),
            missing = missing_columns.len(),
            "feature matrix lacks expected columns, filling with zeros"
        );
    }

    match score_model(entry, &dataset) {
        Ok(mistakes) => Outcome::Scored(Score {
            samples: dataset.target.len(),
            mistakes,
            missing_columns,
        }),
        Err(error) => Outcome::Failed(error),
    }
}

/// Write the evaluations as a JSON array
pub fn write_report(report_path: &Path, evaluations: &[Evaluation]) -> std::io::Result<()> {
    let mut data = JsonValue::new_array();
    let mut file = File::create(report_path)?;

    for evaluation in evaluations {
        let mut entry = object! {};
        entry["antibiotic"] = evaluation.antibiotic.as_str().into();

        match &evaluation.outcome {
            Outcome::Scored(score) => {
                entry["status"] = "scored".into();
                entry["samples"] = score.samples.into();
                entry["mistakes"] = score.mistakes.into();
                entry["accuracy"] = score.accuracy().into();
                entry["missing_columns"] = score.missing_columns.clone().into();
            }
            Outcome::Skipped(error) => {
                entry["status"] = "skipped".into();
                entry["error"] = error.to_string().into();
            }
            Outcome::Failed(error) => {
                entry["status"] = "failed".into();
                entry["error"] = error.to_string().into();
            }
        }

        // Pushing onto an array value cannot fail
        let _ = data.push(entry);
    }

    file.write_all(data.pretty(2).as_bytes())?;

    Ok(())
}
