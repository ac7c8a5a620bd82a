use ndarray::{Array1, ArrayView2};

use crate::error::InferenceError;

pub mod neural_net;
pub mod tree_ensemble;

/// A trained classifier loaded from the model store.
///
/// Implementations are immutable after loading and shared between requests,
/// hence the `Send + Sync` bound.
pub trait Classifier: Send + Sync {
    /// Short name of the artifact format, e.g. "xgb" or "mlp"
    fn kind(&self) -> &'static str;

    /// Number of input columns the classifier was trained on
    fn n_features(&self) -> usize;

    /// Predict the class index of every instance - each instance is a row in "inputs"
    fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError>;
}

/// Reject inputs whose width differs from what the classifier expects
pub(crate) fn check_width(inputs: &ArrayView2<f64>, expected: usize) -> Result<(), InferenceError> {
    if inputs.ncols() != expected {
        return Err(InferenceError::ShapeMismatch {
            expected,
            actual: inputs.ncols(),
        });
    }

    Ok(())
}

/// Index of the largest score, the first one wins on ties
pub(crate) fn argmax<'a>(scores: impl IntoIterator<Item = &'a f64>) -> usize {
    let mut best = (0, f64::NEG_INFINITY);

    for (idx, score) in scores.into_iter().enumerate() {
        if *score > best.1 {
            best = (idx, *score);
        }
    }

    best.0
}
