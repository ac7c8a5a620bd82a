#![allow(dead_code)]

use std::fs;
use std::path::Path;

use amr_predict::error::InferenceError;
use amr_predict::model::Classifier;
use amr_predict::parsing::mapping::EncoderMapping;
use amr_predict::registry::{LabelMap, ModelEntry};
use ndarray::{Array1, ArrayView2, Axis};

pub const ENCODER_MAPPING: &str = r#"{
    "species": {
        "Escherichia coli": {"species_Escherichia coli": 1},
        "Klebsiella pneumoniae": {"species_Klebsiella pneumoniae": 1}
    },
    "country": {
        "Kenya": {"country_Kenya": 1},
        "Uganda": {"country_Uganda": 1}
    },
    "gender": {"Female": {"gender_Female": 1}, "Male": {"gender_Male": 1}}
}"#;

pub fn mapping() -> EncoderMapping {
    EncoderMapping::parse(ENCODER_MAPPING, Path::new("encoder_mapping.json")).expect("mapping")
}

/// Predicts 1 when every input column is set, 0 otherwise
pub struct AllSet {
    pub width: usize,
}

impl Classifier for AllSet {
    fn kind(&self) -> &'static str {
        "all-set"
    }

    fn n_features(&self) -> usize {
        self.width
    }

    fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError> {
        if inputs.ncols() != self.width {
            return Err(InferenceError::ShapeMismatch {
                expected: self.width,
                actual: inputs.ncols(),
            });
        }

        Ok(inputs
            .axis_iter(Axis(0))
            .map(|row| usize::from(row.iter().all(|x| *x == 1.0)))
            .collect())
    }
}

/// Always predicts the same class
pub struct Constant {
    pub width: usize,
    pub class: usize,
}

impl Classifier for Constant {
    fn kind(&self) -> &'static str {
        "constant"
    }

    fn n_features(&self) -> usize {
        self.width
    }

    fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError> {
        Ok(Array1::from_elem(inputs.nrows(), self.class))
    }
}

pub fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn susceptible_resistant() -> LabelMap {
    LabelMap::from_label_indices(vec![
        ("Susceptible".to_string(), 0),
        ("Resistant".to_string(), 1),
    ])
    .expect("labels")
}

pub fn entry(id: &str, classifier: Box<dyn Classifier>, names: &[&str]) -> ModelEntry {
    ModelEntry::new(id, classifier, columns(names), susceptible_resistant())
}

/// XGBoost document with one stump per `(feature, left, right)`, binary logistic
pub fn xgb_model(n_features: usize, stumps: &[(usize, f64, f64)]) -> String {
    let trees: Vec<String> = stumps
        .iter()
        .enumerate()
        .map(|(id, (feature, left, right))| {
            format!(
                r#"{{"id":{id},"left_children":[1,-1,-1],"right_children":[2,-1,-1],
                    "split_indices":[{feature},0,0],"split_conditions":[0.5,{left},{right}],
                    "default_left":[0,0,0],"split_type":[0,0,0],"base_weights":[0,{left},{right}]}}"#
            )
        })
        .collect();
    let tree_info = vec!["0"; stumps.len()].join(",");

    format!(
        r#"{{"learner":{{"attributes":{{}},"feature_names":[],"feature_types":[],
            "gradient_booster":{{"name":"gbtree","model":{{
                "gbtree_model_param":{{"num_trees":"{}","num_parallel_tree":"1"}},
                "trees":[{}],"tree_info":[{}]}}}},
            "learner_model_param":{{"base_score":"5E-1","num_class":"0","num_feature":"{n_features}","num_target":"1"}},
            "objective":{{"name":"binary:logistic","reg_loss_param":{{"scale_pos_weight":"1"}}}}}},
          "version":[2,0,3]}}"#,
        stumps.len(),
        trees.join(","),
        tree_info
    )
}

/// Write the three files of one antibiotic into `dir`
pub fn write_xgb_antibiotic(dir: &Path, name: &str, columns: &[&str], stumps: &[(usize, f64, f64)]) {
    fs::write(
        dir.join(format!("{name}_xgb_model.json")),
        xgb_model(columns.len(), stumps),
    )
    .expect("write model");
    fs::write(
        dir.join(format!("{name}_feature_columns.txt")),
        columns.join(","),
    )
    .expect("write columns");
    fs::write(
        dir.join(format!("{name}_label_mapping.json")),
        r#"{"Susceptible": 0, "Resistant": 1}"#,
    )
    .expect("write labels");
}
