//! Loads the model store directory into a [`Registry`].
//!
//! Each antibiotic `{name}` contributes three files:
//!
//! - `{name}_xgb_model.json` (tree ensemble) or `{name}_mlp_model.json` (dense net)
//! - `{name}_feature_columns.txt`, the ordered input columns (comma or newline separated)
//! - `{name}_label_mapping.json`, a `label -> class index` object
//!
//! A broken antibiotic is left out of the registry and recorded in the
//! [`LoadReport`]; only an unreadable store directory fails the whole load.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::model::neural_net::NeuralNet;
use crate::model::tree_ensemble::TreeEnsemble;
use crate::model::Classifier;
use crate::registry::{LabelMap, ModelEntry, Registry};

pub const FEATURE_COLUMNS_SUFFIX: &str = "_feature_columns.txt";
pub const LABEL_MAPPING_SUFFIX: &str = "_label_mapping.json";

/// Supported classifier artifact formats, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    TreeEnsemble,
    NeuralNet,
}

impl ArtifactKind {
    const ALL: [ArtifactKind; 2] = [ArtifactKind::TreeEnsemble, ArtifactKind::NeuralNet];

    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::TreeEnsemble => "_xgb_model.json",
            ArtifactKind::NeuralNet => "_mlp_model.json",
        }
    }

    fn load(self, path: &Path) -> Result<Box<dyn Classifier>, LoadError> {
        Ok(match self {
            ArtifactKind::TreeEnsemble => Box::new(TreeEnsemble::load(path)?),
            ArtifactKind::NeuralNet => Box::new(NeuralNet::load(path)?),
        })
    }
}

/// An antibiotic that could not be loaded
#[derive(Debug)]
pub struct LoadFailure {
    pub antibiotic: String,
    pub error: LoadError,
}

/// What happened while loading the store
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    pub failures: Vec<LoadFailure>,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Scan `dir` and load every antibiotic found there
pub fn load_model_store(dir: &Path) -> Result<(Registry, LoadReport), LoadError> {
    let read_error = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut file_names = vec![];
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if let Some(name) = entry.file_name().to_str() {
            file_names.push(name.to_string());
        }
    }
    file_names.sort();

    let mut registry = Registry::new();
    let mut report = LoadReport::default();
    let mut sources: Vec<(String, PathBuf)> = vec![];

    for kind in ArtifactKind::ALL {
        for file_name in &file_names {
            let Some(antibiotic) = file_name.strip_suffix(kind.suffix()) else {
                continue;
            };
            if antibiotic.is_empty() {
                debug!(file = %file_name, "skipping artifact without an antibiotic name");
                continue;
            }
            let path = dir.join(file_name);

            if let Some((_, kept)) = sources.iter().find(|(id, _)| id == antibiotic) {
                let error = LoadError::Conflict {
                    antibiotic: antibiotic.to_string(),
                    kept: kept.clone(),
                    ignored: path,
                };
                warn!(antibiotic, %error, "ignoring duplicate model artifact");
                report.failures.push(LoadFailure {
                    antibiotic: antibiotic.to_string(),
                    error,
                });
                continue;
            }
            sources.push((antibiotic.to_string(), path.clone()));

            match load_entry(dir, antibiotic, kind, &path) {
                Ok(entry) => {
                    debug!(
                        antibiotic,
                        kind = entry.classifier().kind(),
                        columns = entry.expected_columns().len(),
                        labels = entry.label_map().len(),
                        "loaded model"
                    );
                    report.loaded.push(antibiotic.to_string());
                    registry.insert(entry);
                }
                Err(error) => {
                    warn!(antibiotic, %error, "failed to load model, leaving it out");
                    report.failures.push(LoadFailure {
                        antibiotic: antibiotic.to_string(),
                        error,
                    });
                }
            }
        }
    }

    report.loaded.sort();
    info!(
        dir = %dir.display(),
        loaded = report.loaded.len(),
        failed = report.failures.len(),
        models = ?report.loaded,
        "model store loaded"
    );

    Ok((registry, report))
}

fn load_entry(
    dir: &Path,
    antibiotic: &str,
    kind: ArtifactKind,
    path: &Path,
) -> Result<ModelEntry, LoadError> {
    let classifier = kind.load(path)?;
    let columns = read_feature_columns(&companion(dir, antibiotic, FEATURE_COLUMNS_SUFFIX)?)?;
    let labels = read_label_mapping(&companion(dir, antibiotic, LABEL_MAPPING_SUFFIX)?)?;

    if classifier.n_features() != columns.len() {
        warn!(
            antibiotic,
            n_features = classifier.n_features(),
            columns = columns.len(),
            "classifier width differs from its feature column list, predictions will fail"
        );
    }

    Ok(ModelEntry::new(antibiotic, classifier, columns, labels))
}

fn companion(dir: &Path, antibiotic: &str, suffix: &str) -> Result<PathBuf, LoadError> {
    let path = dir.join(format!("{antibiotic}{suffix}"));

    if !path.is_file() {
        return Err(LoadError::MissingCompanion { path });
    }

    Ok(path)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read the ordered feature column list
pub fn read_feature_columns(path: &Path) -> Result<Vec<String>, LoadError> {
    parse_feature_columns(&read_file(path)?).map_err(|reason| LoadError::FeatureColumns {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_feature_columns(contents: &str) -> Result<Vec<String>, String> {
    let columns: Vec<String> = contents
        .split([',', '\n'])
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect();

    if columns.is_empty() {
        return Err("no columns listed".to_string());
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = columns.iter().find(|column| !seen.insert(column.as_str())) {
        return Err(format!("column '{duplicate}' is listed twice"));
    }

    Ok(columns)
}

/// Read a `label -> index` object and invert it
pub fn read_label_mapping(path: &Path) -> Result<LabelMap, LoadError> {
    let invalid = |reason: String| LoadError::LabelMapping {
        path: path.to_path_buf(),
        reason,
    };
    let raw: IndexMap<String, serde_json::Value> =
        serde_json::from_str(&read_file(path)?).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    if raw.is_empty() {
        return Err(invalid("no labels defined".to_string()));
    }

    let pairs = raw
        .into_iter()
        .map(|(label, value)| match class_index(&value) {
            Some(index) => Ok((label, index)),
            None => Err(invalid(format!("label '{label}' has invalid index {value}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    LabelMap::from_label_indices(pairs)
        .map_err(|index| invalid(format!("index {index} is assigned to more than one label")))
}

/// Indices are written as integers, integral floats or numeric strings
fn class_index(value: &serde_json::Value) -> Option<usize> {
    match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(i) => usize::try_from(i).ok(),
            None => n
                .as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as usize),
        },
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
