use ndarray::{Array1, Array2};

pub mod dataset;
pub mod mapping;
pub mod store;

/// Feature matrix with one class index per row
pub struct Dataset {
    pub data: Array2<f64>,
    pub target: Array1<usize>,
}
