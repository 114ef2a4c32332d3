//! Opaque learner interface
//!
//! The orchestrator never sees layers — only this capability interface:
//! forward a batch of image tensors to raw scores, push an output gradient
//! back, and expose the trainable parameters for the optimizer.

use ndarray::{Array1, Array3};
use serde::{Deserialize, Serialize};

use super::backbone::{Backbone, BackboneKind, GridPoolBackbone};
use super::head::RegressionHead;
use crate::tensor::Tensor;

/// Model-defining facts persisted with every checkpoint. Resume compares the
/// stored record against the live model before restoring anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub backbone: String,
    pub pretrained: bool,
    pub feature_dim: usize,
    pub num_outputs: usize,
    pub total_parameters: usize,
    pub trainable_parameters: usize,
}

/// Opaque "predict(images) → raw scores" function with learnable parameters.
pub trait Learner: Send {
    /// Forward a batch for training; activations are cached for
    /// [`Learner::backward`].
    fn forward(&mut self, images: &[Array3<f32>]) -> Array1<f32>;

    /// Forward a batch without caching activations or touching gradients.
    fn forward_inference(&self, images: &[Array3<f32>]) -> Array1<f32>;

    /// Propagate d(loss)/d(predictions) into parameter gradients.
    fn backward(&mut self, grad_output: &Array1<f32>);

    /// Trainable parameters, stable order.
    fn parameters(&self) -> Vec<&Tensor>;

    /// Trainable parameters for the optimizer, same order as
    /// [`Learner::parameters`].
    fn parameters_mut(&mut self) -> Vec<&mut Tensor>;

    /// Model-defining facts for checkpoints and reports.
    fn info(&self) -> ModelInfo;
}

/// Frozen backbone + trainable linear head.
pub struct AestheticModel {
    backbone: Box<dyn Backbone>,
    head: RegressionHead,
    pretrained: bool,
    cached_features: Vec<Array1<f32>>,
}

impl AestheticModel {
    pub fn new(kind: BackboneKind, pretrained: bool, seed: u64) -> Self {
        let backbone = GridPoolBackbone::new(kind);
        let head = RegressionHead::new(backbone.feature_dim(), seed);
        Self {
            backbone: Box::new(backbone),
            head,
            pretrained,
            cached_features: Vec::new(),
        }
    }

    fn extract(&self, images: &[Array3<f32>]) -> Vec<Array1<f32>> {
        images.iter().map(|img| self.backbone.features(img)).collect()
    }
}

impl Learner for AestheticModel {
    fn forward(&mut self, images: &[Array3<f32>]) -> Array1<f32> {
        self.cached_features = self.extract(images);
        let scores: Vec<f32> = self
            .cached_features
            .iter()
            .map(|x| self.head.forward(x))
            .collect();
        Array1::from_vec(scores)
    }

    fn forward_inference(&self, images: &[Array3<f32>]) -> Array1<f32> {
        let scores: Vec<f32> = self
            .extract(images)
            .iter()
            .map(|x| self.head.forward(x))
            .collect();
        Array1::from_vec(scores)
    }

    fn backward(&mut self, grad_output: &Array1<f32>) {
        assert_eq!(
            self.cached_features.len(),
            grad_output.len(),
            "backward called without a matching forward"
        );
        self.head.backward(&self.cached_features, grad_output);
    }

    fn parameters(&self) -> Vec<&Tensor> {
        self.head.parameters()
    }

    fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        self.head.parameters_mut()
    }

    fn info(&self) -> ModelInfo {
        let trainable: usize = self.head.parameters().iter().map(|t| t.len()).sum();
        ModelInfo {
            backbone: self.backbone.kind().to_string(),
            pretrained: self.pretrained,
            feature_dim: self.backbone.feature_dim(),
            num_outputs: 1,
            total_parameters: trainable,
            trainable_parameters: trainable,
        }
    }
}
