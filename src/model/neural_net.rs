use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::{argmax, check_width, Classifier};
use crate::error::{InferenceError, LoadError};

/// Represents a trained feed-forward neural net
pub struct NeuralNet {
    pub layers: Vec<(Array2<f64>, Array1<f64>)>, // Each layer holds a weight matrix and a bias vector
    pub activation_function: ActivationFunction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivationFunction {
    ReLU,
    Sigmoid,
    Tanh,
    Linear,
    LeakyReLU,
}

impl ActivationFunction {
    fn from_name(name: &str) -> Option<ActivationFunction> {
        match name {
            "relu" => Some(ActivationFunction::ReLU),
            "sigmoid" => Some(ActivationFunction::Sigmoid),
            "tanh" => Some(ActivationFunction::Tanh),
            "linear" => Some(ActivationFunction::Linear),
            "leaky_relu" => Some(ActivationFunction::LeakyReLU),
            _ => None,
        }
    }
}

impl NeuralNet {
    /// Read a net from a `*_mlp_model.json` layer export
    pub fn load(path: &Path) -> Result<NeuralNet, LoadError> {
        let contents = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        NeuralNet::parse(&contents).map_err(|message| LoadError::LayerExport {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse a layer export. The keys are W0, b0, W1, b1, ... and the values are
    /// flat arrays of the weights; W_i is stored row-major with shape (inputs, outputs).
    /// An optional "activation" key names the hidden-layer activation (relu by default)
    pub fn parse(contents: &str) -> Result<NeuralNet, String> {
        let data = json::parse(contents).map_err(|e| e.to_string())?;
        if !data.is_object() {
            return Err("expected a JSON object".to_string());
        }

        let activation_function = match data["activation"].as_str() {
            Some(name) => ActivationFunction::from_name(name)
                .ok_or_else(|| format!("unknown activation '{}'", name))?,
            None if data["activation"].is_null() => ActivationFunction::ReLU,
            None => return Err("activation must be a string".to_string()),
        };

        let mut layers: Vec<(Array2<f64>, Array1<f64>)> = vec![];

        // Layers are numbered from 0 without gaps
        for i in 0.. {
            let w_key = format!("W{}", i);
            let b_key = format!("b{}", i);

            if data[w_key.as_str()].is_null() && data[b_key.as_str()].is_null() {
                break;
            }

            let w = numbers(&data[w_key.as_str()], &w_key)?;
            let b = numbers(&data[b_key.as_str()], &b_key)?;

            if b.is_empty() || w.len() % b.len() != 0 {
                return Err(format!(
                    "{} has {} weights which is not a multiple of the {} biases",
                    w_key,
                    w.len(),
                    b.len()
                ));
            }

            let outputs = b.len();
            let inputs = w.len() / outputs;

            // The input of this layer is the output of the previous one
            if let Some((prev, _)) = layers.last() {
                if prev.ncols() != inputs {
                    return Err(format!(
                        "{} expects {} inputs but the previous layer has {} outputs",
                        w_key,
                        inputs,
                        prev.ncols()
                    ));
                }
            }

            let weights = Array2::from_shape_vec((inputs, outputs), w).map_err(|e| e.to_string())?;
            layers.push((weights, Array1::from_vec(b)));
        }

        if layers.is_empty() {
            return Err("no layers found".to_string());
        }

        Ok(NeuralNet {
            layers,
            activation_function,
        })
    }

    /// Perform a forward pass of the network on some input and return the output scores
    fn forward(&self, inputs: &ArrayView2<f64>) -> Array2<f64> {
        let mut hidden = inputs.to_owned();

        // We iterate for every layer
        let mut it = self.layers.iter().peekable();

        while let Some(layer) = it.next() {
            let lin_output = hidden.dot(&layer.0) + &layer.1;
            // If the layer is a hidden layer, we apply the activation function
            // and otherwise (this is the output layer) the output is the linear output
            hidden = match it.peek() {
                Some(_) => lin_output.map(|x| activation(self.activation_function, *x)),
                None => lin_output,
            };
        }

        hidden
    }
}

impl Classifier for NeuralNet {
    fn kind(&self) -> &'static str {
        "mlp"
    }

    fn n_features(&self) -> usize {
        self.layers[0].0.nrows()
    }

    /// Predict the class of every instance. A single output unit is read as a logit
    fn predict(&self, inputs: &ArrayView2<f64>) -> Result<Array1<usize>, InferenceError> {
        check_width(inputs, self.n_features())?;

        let scores = self.forward(inputs);

        if scores.iter().any(|x| x.is_nan()) {
            return Err(InferenceError::Predictor(
                "network produced NaN scores".to_string(),
            ));
        }

        Ok(scores
            .axis_iter(Axis(0))
            .map(|row| match row.len() {
                1 => usize::from(row[0] > 0f64),
                _ => argmax(row.iter()),
            })
            .collect())
    }
}

fn activation(name: ActivationFunction, z: f64) -> f64 {
    match name {
        ActivationFunction::ReLU => z.max(0f64),
        ActivationFunction::Sigmoid => (1f64 + (-z).exp()).recip(),
        ActivationFunction::Tanh => z.tanh(),
        ActivationFunction::Linear => z,
        ActivationFunction::LeakyReLU => z.max(0.01 * z),
    }
}

fn numbers(value: &json::JsonValue, key: &str) -> Result<Vec<f64>, String> {
    if !value.is_array() {
        return Err(format!("{} must be an array of numbers", key));
    }

    value
        .members()
        .map(|x| x.as_f64().ok_or_else(|| format!("{} contains a non-numeric value", key)))
        .collect()
}
