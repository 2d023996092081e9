//! Multilayer perceptron inference
//!
//! The artifact mirrors a trained scikit-learn style network: one weight
//! matrix (`inputs x outputs`) and one bias vector per layer, a shared hidden
//! activation and an output activation.

use std::path::Path;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use crate::error::{GenderError, Result};

/// Anything that turns a standardized feature vector into a
/// `[female, male]` probability pair.
pub trait ProbabilityModel: Send + Sync {
    fn input_dim(&self) -> usize;

    fn predict_proba(&self, features: ArrayView1<'_, f32>) -> Result<[f32; 2]>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Identity,
    Logistic,
    Tanh,
    Relu,
}

impl Activation {
    fn apply(self, values: &mut Array1<f32>) {
        match self {
            Activation::Identity => {}
            Activation::Logistic => values.mapv_inplace(sigmoid),
            Activation::Tanh => values.mapv_inplace(f32::tanh),
            Activation::Relu => values.mapv_inplace(|v| v.max(0.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// One output unit holding P(male).
    Logistic,
    /// Two output units, one per class.
    Softmax,
}

impl OutputActivation {
    fn width(self) -> usize {
        match self {
            OutputActivation::Logistic => 1,
            OutputActivation::Softmax => 2,
        }
    }
}

/// Serialized form of [`MlpClassifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpArtifact {
    pub hidden_activation: Activation,
    pub output_activation: OutputActivation,
    pub coefs: Vec<Vec<Vec<f32>>>,
    pub intercepts: Vec<Vec<f32>>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Array2<f32>,
    biases: Array1<f32>,
}

impl DenseLayer {
    fn forward(&self, input: ArrayView1<'_, f32>) -> Array1<f32> {
        input.dot(&self.weights) + &self.biases
    }
}

#[derive(Debug, Clone)]
pub struct MlpClassifier {
    layers: Vec<DenseLayer>,
    hidden_activation: Activation,
    output_activation: OutputActivation,
}

impl MlpClassifier {
    /// Load a JSON artifact. Any failure is a `ModelLoad` error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| GenderError::model_load(format!("Cannot read model {}: {}", path.display(), e)))?;
        let artifact: MlpArtifact = serde_json::from_str(&content)
            .map_err(|e| GenderError::model_load(format!("Malformed model {}: {}", path.display(), e)))?;
        Self::from_artifact(artifact)
    }

    pub fn from_artifact(artifact: MlpArtifact) -> Result<Self> {
        if artifact.coefs.is_empty() {
            return Err(GenderError::model_load("Model has no layers"));
        }
        if artifact.coefs.len() != artifact.intercepts.len() {
            return Err(GenderError::model_load(format!(
                "Model has {} weight matrices but {} bias vectors",
                artifact.coefs.len(), artifact.intercepts.len()
            )));
        }

        let mut layers = Vec::with_capacity(artifact.coefs.len());
        let mut expected_inputs: Option<usize> = None;

        for (index, (coef, bias)) in artifact.coefs.into_iter().zip(artifact.intercepts).enumerate() {
            let inputs = coef.len();
            let outputs = coef.first().map(Vec::len).unwrap_or(0);
            if inputs == 0 || outputs == 0 {
                return Err(GenderError::model_load(format!("Layer {} is empty", index)));
            }
            if let Some(expected) = expected_inputs {
                if inputs != expected {
                    return Err(GenderError::model_load(format!(
                        "Layer {} expects {} inputs but previous layer produces {}", index, inputs, expected
                    )));
                }
            }
            if bias.len() != outputs {
                return Err(GenderError::model_load(format!(
                    "Layer {} has {} outputs but {} biases", index, outputs, bias.len()
                )));
            }
            if coef.iter().any(|row| row.len() != outputs) {
                return Err(GenderError::model_load(format!("Layer {} has ragged weight rows", index)));
            }

            let flat: Vec<f32> = coef.into_iter().flatten().collect();
            if flat.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
                return Err(GenderError::model_load(format!("Layer {} contains non-finite values", index)));
            }

            let weights = Array2::from_shape_vec((inputs, outputs), flat)
                .map_err(|e| GenderError::model_load(format!("Layer {}: {}", index, e)))?;
            layers.push(DenseLayer { weights, biases: Array1::from(bias) });
            expected_inputs = Some(outputs);
        }

        let output_width = expected_inputs.unwrap_or(0);
        if output_width != artifact.output_activation.width() {
            return Err(GenderError::model_load(format!(
                "{:?} output expects {} units, model has {}",
                artifact.output_activation, artifact.output_activation.width(), output_width
            )));
        }

        Ok(Self {
            layers,
            hidden_activation: artifact.hidden_activation,
            output_activation: artifact.output_activation,
        })
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

impl ProbabilityModel for MlpClassifier {
    fn input_dim(&self) -> usize {
        self.layers.first().map(|l| l.weights.nrows()).unwrap_or(0)
    }

    fn predict_proba(&self, features: ArrayView1<'_, f32>) -> Result<[f32; 2]> {
        if features.len() != self.input_dim() {
            return Err(GenderError::dimension_mismatch(self.input_dim(), features.len()));
        }

        let last = self.layers.len() - 1;
        let mut activations = features.to_owned();
        for (index, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(activations.view());
            if index < last {
                self.hidden_activation.apply(&mut activations);
            }
        }

        let probabilities = match self.output_activation {
            OutputActivation::Logistic => {
                let p = sigmoid(activations[0]);
                [1.0 - p, p]
            }
            OutputActivation::Softmax => softmax2(activations[0], activations[1]),
        };

        Ok(probabilities)
    }
}

fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn softmax2(a: f32, b: f32) -> [f32; 2] {
    let max = a.max(b);
    let ea = (a - max).exp();
    let eb = (b - max).exp();
    let sum = ea + eb;
    [ea / sum, eb / sum]
}
