//! Combined aesthetic loss
//!
//! MSE carries the regression signal; a pairwise ranking-consistency penalty
//! keeps relative ordering honest. The two are combined with fixed weights
//! 1.0 and 0.1. Gradients are closed-form, so validation can evaluate the
//! loss without any gradient machinery.

use ndarray::Array1;

/// Loss value split into its components.
#[derive(Debug, Clone, Copy)]
pub struct LossBreakdown {
    pub total: f32,
    pub mse: f32,
    pub ranking: f32,
}

/// MSE plus ranking-consistency penalty with fixed weights.
pub struct AestheticLoss {
    mse_weight: f32,
    ranking_weight: f32,
}

impl Default for AestheticLoss {
    fn default() -> Self {
        Self::new(1.0, 0.1)
    }
}

impl AestheticLoss {
    pub fn new(mse_weight: f32, ranking_weight: f32) -> Self {
        Self {
            mse_weight,
            ranking_weight,
        }
    }

    /// Compute the loss breakdown for a batch.
    pub fn forward(&self, predictions: &Array1<f32>, targets: &Array1<f32>) -> LossBreakdown {
        assert_eq!(
            predictions.len(),
            targets.len(),
            "predictions and targets must have same length"
        );
        let n = predictions.len();

        let mse = if n == 0 {
            0.0
        } else {
            predictions
                .iter()
                .zip(targets.iter())
                .map(|(&p, &y)| (p - y) * (p - y))
                .sum::<f32>()
                / n as f32
        };

        let ranking = self.ranking_penalty(predictions, targets);

        LossBreakdown {
            total: self.mse_weight * mse + self.ranking_weight * ranking,
            mse,
            ranking,
        }
    }

    /// Gradient of the combined loss with respect to the predictions.
    pub fn backward(&self, predictions: &Array1<f32>, targets: &Array1<f32>) -> Array1<f32> {
        let n = predictions.len();
        let mut grad = Array1::<f32>::zeros(n);
        if n == 0 {
            return grad;
        }

        // d(MSE)/d(pᵢ) = 2 (pᵢ − yᵢ) / n
        for i in 0..n {
            grad[i] = self.mse_weight * 2.0 * (predictions[i] - targets[i]) / n as f32;
        }

        // Ranking term: each ordered pair (i, j) with
        // −(pᵢ−pⱼ)(yᵢ−yⱼ) > 0 contributes −(yᵢ−yⱼ)/n² to gᵢ and the
        // negation to gⱼ. Self-pairs never violate.
        if n > 1 {
            let pairs = (n * n) as f32;
            let scale = self.ranking_weight / pairs;
            for i in 0..n {
                for j in 0..n {
                    let pred_diff = predictions[i] - predictions[j];
                    let target_diff = targets[i] - targets[j];
                    if -pred_diff * target_diff > 0.0 {
                        grad[i] -= scale * target_diff;
                        grad[j] += scale * target_diff;
                    }
                }
            }
        }

        grad
    }

    /// Mean over all n² ordered pairs of max(0, −(pᵢ−pⱼ)(yᵢ−yⱼ)).
    /// Defined as 0 for batches with fewer than two examples.
    fn ranking_penalty(&self, predictions: &Array1<f32>, targets: &Array1<f32>) -> f32 {
        let n = predictions.len();
        if n < 2 {
            return 0.0;
        }

        let mut violations = 0.0f32;
        for i in 0..n {
            for j in 0..n {
                let pred_diff = predictions[i] - predictions[j];
                let target_diff = targets[i] - targets[j];
                violations += (-pred_diff * target_diff).max(0.0);
            }
        }
        violations / (n * n) as f32
    }
}
