use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use super::{check_len, Regressor};
use crate::errors::ModelError;

/// Element-wise activation applied after a dense layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// `max(0, x)`.
    Relu,
    /// Hyperbolic tangent.
    Tanh,
    /// Logistic sigmoid.
    Sigmoid,
    /// No activation; used on the output layer of a regressor.
    Identity,
}

impl Activation {
    fn apply(self, value: f64) -> f64 {
        match self {
            Activation::Relu => value.max(0.0),
            Activation::Tanh => value.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-value).exp()),
            Activation::Identity => value,
        }
    }
}

/// Serialized form of a single dense layer.
#[derive(Clone, Debug, Deserialize)]
pub struct DenseLayer {
    /// Weight matrix, one row per output unit.
    pub weights: Vec<Vec<f64>>,
    /// Bias per output unit.
    pub biases: Vec<f64>,
    /// Activation applied to the layer output.
    pub activation: Activation,
}

/// A fully connected layer in matrix form.
#[derive(Clone, Debug)]
struct Layer {
    weights: DMatrix<f64>,
    biases: DVector<f64>,
    activation: Activation,
}

/// Feed-forward neural network with a single output unit.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "RawNetwork")]
pub struct DenseNetwork {
    /// Layers applied in order.
    layers: Vec<Layer>,
}

#[derive(Deserialize)]
struct RawNetwork {
    layers: Vec<DenseLayer>,
}

impl TryFrom<RawNetwork> for DenseNetwork {
    type Error = ModelError;

    fn try_from(raw: RawNetwork) -> Result<Self, Self::Error> {
        DenseNetwork::new(raw.layers)
    }
}

impl DenseNetwork {
    /// Assemble a network, checking that consecutive layers line up and the
    /// last layer produces exactly one value.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidModel`] describing the first inconsistency.
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, ModelError> {
        if layers.is_empty() {
            return Err(ModelError::InvalidModel(
                "network has no layers".to_string(),
            ));
        }
        let mut built = Vec::with_capacity(layers.len());
        let mut expected_inputs: Option<usize> = None;
        for (index, layer) in layers.into_iter().enumerate() {
            let outputs = layer.weights.len();
            let inputs = layer.weights.first().map_or(0, Vec::len);
            if outputs == 0 || inputs == 0 {
                return Err(ModelError::InvalidModel(format!("layer {index} is empty")));
            }
            if layer.weights.iter().any(|row| row.len() != inputs) {
                return Err(ModelError::InvalidModel(format!(
                    "layer {index} has ragged weight rows"
                )));
            }
            if layer.biases.len() != outputs {
                return Err(ModelError::InvalidModel(format!(
                    "layer {index} has {} biases for {outputs} outputs",
                    layer.biases.len()
                )));
            }
            if let Some(expected) = expected_inputs {
                if expected != inputs {
                    return Err(ModelError::InvalidModel(format!(
                        "layer {index} expects {inputs} inputs but the previous layer produces {expected}"
                    )));
                }
            }
            expected_inputs = Some(outputs);
            built.push(Layer {
                weights: DMatrix::from_row_iterator(
                    outputs,
                    inputs,
                    layer.weights.into_iter().flatten(),
                ),
                biases: DVector::from_vec(layer.biases),
                activation: layer.activation,
            });
        }
        if expected_inputs != Some(1) {
            return Err(ModelError::InvalidModel(
                "the output layer must produce exactly one value".to_string(),
            ));
        }
        Ok(Self { layers: built })
    }
}

impl Regressor for DenseNetwork {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_len(self.input_len(), features)?;
        let mut activations = DVector::from_column_slice(features);
        for layer in &self.layers {
            activations = (&layer.weights * activations + &layer.biases)
                .map(|value| layer.activation.apply(value));
        }
        Ok(activations[0])
    }

    fn input_len(&self) -> usize {
        self.layers[0].weights.ncols()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn two_layer() -> DenseNetwork {
        DenseNetwork::new(vec![
            DenseLayer {
                weights: vec![vec![1.0, -1.0], vec![0.5, 0.5]],
                biases: vec![0.0, 1.0],
                activation: Activation::Relu,
            },
            DenseLayer {
                weights: vec![vec![2.0, 3.0]],
                biases: vec![-1.0],
                activation: Activation::Identity,
            },
        ])
        .expect("consistent layers")
    }

    #[test]
    fn evaluates_layers_in_order() {
        let network = two_layer();
        // hidden = relu([1 - 3, 0.5 + 1.5 + 1]) = [0, 3]; output = 0 + 9 - 1
        assert_relative_eq!(network.predict(&[1.0, 3.0]).expect("two inputs"), 8.0);
        // hidden = relu([2, 3]) = [2, 3]; output = 4 + 9 - 1
        assert_relative_eq!(network.predict(&[3.0, 1.0]).expect("two inputs"), 12.0);
    }

    #[test]
    fn rejects_wrong_input_length() {
        assert!(matches!(
            two_layer().predict(&[1.0]),
            Err(ModelError::FeatureCount {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn rejects_mismatched_layers() {
        let error = DenseNetwork::new(vec![
            DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                biases: vec![0.0],
                activation: Activation::Tanh,
            },
            DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                biases: vec![0.0],
                activation: Activation::Identity,
            },
        ])
        .expect_err("second layer expects two inputs");
        assert!(matches!(error, ModelError::InvalidModel(_)));
    }

    #[test]
    fn rejects_multi_output_networks() {
        let error = DenseNetwork::new(vec![DenseLayer {
            weights: vec![vec![1.0], vec![1.0]],
            biases: vec![0.0, 0.0],
            activation: Activation::Identity,
        }])
        .expect_err("two outputs");
        assert!(matches!(error, ModelError::InvalidModel(_)));
    }

    #[test]
    fn loads_from_json() {
        let network: DenseNetwork = serde_json::from_str(
            r#"{"layers": [{"weights": [[0.0, 0.0]], "biases": [0.0], "activation": "sigmoid"}]}"#,
        )
        .expect("valid network");
        assert_relative_eq!(network.predict(&[5.0, -5.0]).expect("two inputs"), 0.5);
    }
}
