//! Trainable regression head
//!
//! A single linear layer mapping backbone features to one scalar score. The
//! backward pass is closed-form: for per-sample output gradients gᵢ and
//! cached features xᵢ, dW = Σ gᵢ·xᵢ and db = Σ gᵢ.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tensor::Tensor;

/// Linear regression head: `score = w · features + b`.
pub struct RegressionHead {
    weight: Tensor,
    bias: Tensor,
}

impl RegressionHead {
    /// Seeded uniform init in ±1/√dim, so runs with the same seed start from
    /// identical parameters.
    pub fn new(feature_dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let bound = 1.0 / (feature_dim as f32).sqrt();
        let weights: Vec<f32> = (0..feature_dim).map(|_| rng.gen_range(-bound..bound)).collect();

        Self {
            weight: Tensor::from_vec(weights, true),
            bias: Tensor::zeros(1, true),
        }
    }

    /// Score a single feature vector.
    pub fn forward(&self, features: &Array1<f32>) -> f32 {
        self.weight.data().dot(features) + self.bias.data()[0]
    }

    /// Accumulate gradients for a batch of cached features.
    pub fn backward(&mut self, features: &[Array1<f32>], grad_output: &Array1<f32>) {
        assert_eq!(
            features.len(),
            grad_output.len(),
            "cached features and output gradient must align"
        );

        let mut grad_w = Array1::<f32>::zeros(self.weight.len());
        let mut grad_b = 0.0f32;
        for (x, &g) in features.iter().zip(grad_output.iter()) {
            grad_w.scaled_add(g, x);
            grad_b += g;
        }

        self.weight.accumulate_grad(&grad_w);
        self.bias.accumulate_grad(&Array1::from_vec(vec![grad_b]));
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    pub fn parameters(&self) -> Vec<&Tensor> {
        vec![&self.weight, &self.bias]
    }

    pub fn parameters_mut(&mut self) -> Vec<&mut Tensor> {
        vec![&mut self.weight, &mut self.bias]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_same_seed_same_init() {
        let a = RegressionHead::new(16, 42);
        let b = RegressionHead::new(16, 42);
        assert_eq!(a.weight.data(), b.weight.data());
    }

    #[test]
    fn test_different_seed_different_init() {
        let a = RegressionHead::new(16, 1);
        let b = RegressionHead::new(16, 2);
        assert_ne!(a.weight.data(), b.weight.data());
    }

    #[test]
    fn test_forward_is_affine() {
        let mut head = RegressionHead::new(3, 0);
        head.weight.data_mut().assign(&arr1(&[1.0, 2.0, 3.0]));
        head.bias.data_mut()[0] = 0.5;

        let score = head.forward(&arr1(&[1.0, 1.0, 1.0]));
        assert_abs_diff_eq!(score, 6.5, epsilon = 1e-6);
    }

    #[test]
    fn test_backward_accumulates_closed_form() {
        let mut head = RegressionHead::new(2, 0);
        let features = vec![arr1(&[1.0, 0.0]), arr1(&[0.0, 2.0])];
        let grad_output = arr1(&[0.5, -1.0]);

        head.backward(&features, &grad_output);

        let grad_w = head.weight.grad().unwrap();
        assert_abs_diff_eq!(grad_w[0], 0.5, epsilon = 1e-6); // 0.5*1.0
        assert_abs_diff_eq!(grad_w[1], -2.0, epsilon = 1e-6); // -1.0*2.0
        let grad_b = head.bias.grad().unwrap();
        assert_abs_diff_eq!(grad_b[0], -0.5, epsilon = 1e-6); // 0.5 - 1.0
    }
}
