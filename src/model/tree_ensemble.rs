//! Gradient-boosted tree ensembles stored in the XGBoost `save_model` JSON layout.
//!
//! Only the parts needed for inference are read: the trees, the class each
//! tree contributes to (`tree_info`), the base score and the objective.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::Deserialize;

use super::{argmax, check_width, Classifier};
use crate::error::{InferenceError, LoadError};

#[derive(Deserialize)]
struct Document {
    learner: Learner,
}

#[derive(Deserialize)]
struct Learner {
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveParam,
}

#[derive(Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<BoosterModel>,
}

#[derive(Deserialize)]
struct BoosterModel {
    trees: Vec<RawTree>,
    tree_info: Vec<usize>,
}

#[derive(Deserialize)]
struct LearnerModelParam {
    base_score: String,
    #[serde(default)]
    num_class: Option<String>,
    num_feature: String,
}

#[derive(Deserialize)]
struct ObjectiveParam {
    name: String,
}

#[derive(Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older writers emit 0/1, newer ones booleans
#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Objective {
    BinaryLogistic,
    BinaryLogitRaw,
    BinaryHinge,
    Multiclass(usize),
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Walk from the root to a leaf and return the leaf value.
    /// Children always have a larger index than their parent, so the walk terminates.
    /// Splits compare in single precision, like the trees were trained.
    fn leaf_value(&self, row: &ArrayView1<f64>) -> f64 {
        let mut idx = 0;

        loop {
            match &self.nodes[idx] {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = row[*feature];
                    idx = if x.is_nan() {
                        if *default_left {
                            *left
                        } else {
                            *right
                        }
                    } else if (x as f32) < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// A boosted tree ensemble classifier
#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    trees: Vec<Tree>,
    tree_class: Vec<usize>,
    base_margin: Vec<f64>,
    objective: Objective,
    n_features: usize,
}

impl TreeEnsemble {
    /// Read an ensemble from a `*_xgb_model.json` file
    pub fn load(path: &Path) -> Result<TreeEnsemble, LoadError> {
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        TreeEnsemble::parse(&contents, path)
    }

    /// Parse the JSON document. `path` is only used in error messages
    pub fn parse(contents: &str, path: &Path) -> Result<TreeEnsemble, LoadError> {
        let invalid = |reason: String| LoadError::Model {
            path: path.to_path_buf(),
            reason,
        };
        let document: Document =
            serde_json::from_str(contents).map_err(|source| LoadError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let learner = document.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(invalid(format!(
                "booster '{}' is not supported",
                learner.gradient_booster.name
            )));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| invalid("booster has no model section".to_string()))?;

        let params = &learner.learner_model_param;
        let n_features: usize = parse_param("num_feature", &params.num_feature).map_err(&invalid)?;
        let num_class: usize = match &params.num_class {
            Some(value) => parse_param("num_class", value).map_err(&invalid)?,
            None => 0,
        };
        let base_score = parse_base_score(&params.base_score).map_err(&invalid)?;

        let objective = match learner.objective.name.as_str() {
            "binary:logistic" => Objective::BinaryLogistic,
            "binary:logitraw" => Objective::BinaryLogitRaw,
            "binary:hinge" => Objective::BinaryHinge,
            "multi:softmax" | "multi:softprob" if num_class >= 2 => Objective::Multiclass(num_class),
            "multi:softmax" | "multi:softprob" => {
                return Err(invalid(format!("multiclass objective with num_class {num_class}")))
            }
            other => return Err(invalid(format!("objective '{other}' is not supported"))),
        };

        let base_margin = match objective {
            Objective::BinaryLogistic => {
                let p = base_score[0];
                if !(p > 0.0 && p < 1.0) {
                    return Err(invalid(format!("base_score {p} is not a probability")));
                }
                vec![(p / (1.0 - p)).ln()]
            }
            Objective::BinaryLogitRaw | Objective::BinaryHinge => vec![base_score[0]],
            Objective::Multiclass(n) if base_score.len() == n => base_score,
            Objective::Multiclass(n) => vec![base_score[0]; n],
        };

        if model.trees.len() != model.tree_info.len() {
            return Err(invalid(format!(
                "{} trees but {} tree_info entries",
                model.trees.len(),
                model.tree_info.len()
            )));
        }
        let n_outputs = match objective {
            Objective::Multiclass(n) => n,
            _ => 1,
        };
        if let Some(class) = model.tree_info.iter().find(|class| **class >= n_outputs) {
            return Err(invalid(format!("tree assigned to class {class} of {n_outputs}")));
        }

        let trees = model
            .trees
            .into_iter()
            .enumerate()
            .map(|(idx, raw)| build_tree(raw, n_features).map_err(|e| invalid(format!("tree {idx}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TreeEnsemble {
            trees,
            tree_class: model.tree_info,
            base_margin,
            objective,
            n_features,
        })
    }

    /// Raw per-class margins of one instance
    fn margins(&self, row: &ArrayView1<f64>) -> Vec<f64> {
        let mut margins = self.base_margin.clone();

        for (tree, class) in self.trees.iter().zip(&self.tree_class) {
            margins[*class] += tree.leaf_value(row);
        }

        margins
    }

    fn classify(&self, row: &ArrayView1<f64>) -> usize {
        let margins = self.margins(row);

        match self.objective {
            // sigmoid(margin) > 0.5 is the same test as margin > 0
            Objective::BinaryLogistic | Objective::BinaryHinge => usize::from(margins[0] > 0.0),
            // The raw margin itself is compared with 0.5
            Objective::BinaryLogitRaw => usize::from(margins[0] > 0.5),
            Objective::Multiclass(_) => argmax(&margins),
        }
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> &'static str {
        "xgb"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError> {
        check_width(inputs, self.n_features)?;

        Ok(inputs
            .axis_iter(Axis(0))
            .map(|row| self.classify(&row))
            .collect())
    }
}

fn parse_param<T: FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid {name} '{value}'"))
}

/// Base scores are written as "5E-1", or as "[5E-1,...]" by multi-target writers
fn parse_base_score(value: &str) -> Result<Vec<f64>, String> {
    let inner = value.trim().trim_start_matches('[').trim_end_matches(']');
    let scores = inner
        .split(',')
        .map(|x| parse_param::<f64>("base_score", x))
        .collect::<Result<Vec<_>, _>>()?;

    if scores.is_empty() {
        return Err(format!("invalid base_score '{value}'"));
    }

    Ok(scores)
}

fn build_tree(raw: RawTree, n_features: usize) -> Result<Tree, String> {
    let n = raw.left_children.len();

    if n == 0 {
        return Err("empty tree".to_string());
    }
    if raw.right_children.len() != n
        || raw.split_indices.len() != n
        || raw.split_conditions.len() != n
        || raw.default_left.len() != n
    {
        return Err("node arrays have different lengths".to_string());
    }
    if raw.split_type.iter().any(|t| *t != 0) {
        return Err("categorical splits are not supported".to_string());
    }

    let child = |idx: usize, value: i64| -> Result<usize, String> {
        match usize::try_from(value) {
            Ok(c) if c > idx && c < n => Ok(c),
            _ => Err(format!("node {idx} has invalid child {value}")),
        }
    };

    let mut nodes = Vec::with_capacity(n);
    for idx in 0..n {
        // -1 marks a leaf, whose value is stored in split_conditions
        if raw.left_children[idx] == -1 {
            nodes.push(Node::Leaf(raw.split_conditions[idx]));
            continue;
        }

        let feature = raw.split_indices[idx];
        if feature >= n_features {
            return Err(format!("node {idx} splits on feature {feature} of {n_features}"));
        }

        nodes.push(Node::Split {
            feature,
            threshold: raw.split_conditions[idx] as f32,
            left: child(idx, raw.left_children[idx])?,
            right: child(idx, raw.right_children[idx])?,
            default_left: raw.default_left[idx].is_set(),
        });
    }

    Ok(Tree { nodes })
}
