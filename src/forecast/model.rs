//! Inference-only generative model.
//!
//! The generator maps `noise ++ window` to one normalized price. Training
//! happens elsewhere; this module only loads exported weights and evaluates
//! them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ForecastError;

/// Stateless predictor, safe to call from several ensemble draws at once.
pub trait GenerativeModel: Send + Sync {
    /// Expected input width.
    fn input_dim(&self) -> usize;

    fn predict(&self, input: &[f64]) -> Result<f64, ForecastError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Self::Linear => x,
            Self::Relu => x.max(0.0),
            Self::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Self::Tanh => x.tanh(),
        }
    }
}

/// Fully connected layer. `weights[o][i]` links input `i` to output `o`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default = "default_activation")]
    pub activation: Activation,
}

fn default_activation() -> Activation {
    Activation::Linear
}

impl DenseLayer {
    fn input_dim(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn output_dim(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b;
                self.activation.apply(z)
            })
            .collect()
    }
}

/// Feed-forward generator exported as JSON:
///
/// ```json
/// { "layers": [ { "weights": [[...]], "bias": [...], "activation": "relu" } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseGenerator {
    layers: Vec<DenseLayer>,
}

impl DenseGenerator {
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self, ForecastError> {
        let model = Self { layers };
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForecastError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ForecastError::Artifact(format!("cannot read model {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ForecastError> {
        let model: Self = serde_json::from_str(raw)?;
        model.validate()?;
        Ok(model)
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    fn validate(&self) -> Result<(), ForecastError> {
        let Some(last) = self.layers.last() else {
            return Err(ForecastError::Artifact("model has no layers".to_string()));
        };

        for (idx, layer) in self.layers.iter().enumerate() {
            if layer.output_dim() == 0 || layer.input_dim() == 0 {
                return Err(ForecastError::Artifact(format!("layer {} is empty", idx)));
            }
            if layer.bias.len() != layer.output_dim() {
                return Err(ForecastError::Artifact(format!(
                    "layer {}: {} biases for {} outputs",
                    idx,
                    layer.bias.len(),
                    layer.output_dim()
                )));
            }
            let width = layer.input_dim();
            if layer.weights.iter().any(|row| row.len() != width) {
                return Err(ForecastError::Artifact(format!(
                    "layer {}: ragged weight matrix",
                    idx
                )));
            }
        }

        for (idx, pair) in self.layers.windows(2).enumerate() {
            if pair[0].output_dim() != pair[1].input_dim() {
                return Err(ForecastError::Artifact(format!(
                    "layer {} emits {} values but layer {} expects {}",
                    idx,
                    pair[0].output_dim(),
                    idx + 1,
                    pair[1].input_dim()
                )));
            }
        }

        if last.output_dim() != 1 {
            return Err(ForecastError::Artifact(format!(
                "final layer must emit one value, emits {}",
                last.output_dim()
            )));
        }
        Ok(())
    }
}

impl GenerativeModel for DenseGenerator {
    fn input_dim(&self) -> usize {
        self.layers.first().map(DenseLayer::input_dim).unwrap_or(0)
    }

    fn predict(&self, input: &[f64]) -> Result<f64, ForecastError> {
        if input.len() != self.input_dim() {
            return Err(ForecastError::Model(format!(
                "input has {} values, model expects {}",
                input.len(),
                self.input_dim()
            )));
        }

        let mut activations = input.to_vec();
        for layer in &self.layers {
            activations = layer.forward(&activations);
        }

        match activations.as_slice() {
            [value] if value.is_finite() => Ok(*value),
            [value] => Err(ForecastError::Model(format!(
                "model produced non-finite output {}",
                value
            ))),
            other => Err(ForecastError::Model(format!(
                "model produced {} outputs",
                other.len()
            ))),
        }
    }
}
