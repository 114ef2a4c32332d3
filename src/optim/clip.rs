//! Gradient clipping utilities

use crate::tensor::Tensor;

/// Clip gradients by global norm.
///
/// Computes the global norm across all parameter gradients and scales them
/// down when the norm exceeds `max_norm`, preserving relative magnitudes
/// between parameters.
///
/// # Returns
/// The global norm before clipping.
pub fn clip_grad_norm(params: &mut [&mut Tensor], max_norm: f32) -> f32 {
    let mut total_norm_sq = 0.0;
    for param in params.iter() {
        if let Some(grad) = param.grad() {
            total_norm_sq += grad.iter().map(|&g| g * g).sum::<f32>();
        }
    }

    let global_norm = total_norm_sq.sqrt();

    if global_norm > max_norm {
        let clip_coef = max_norm / global_norm;
        for param in params.iter_mut() {
            let clipped = param.grad().map(|grad| grad * clip_coef);
            if let Some(clipped) = clipped {
                param.set_grad(clipped);
            }
        }
    }

    global_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_below_threshold_untouched() {
        let mut p0 = Tensor::from_vec(vec![1.0, 2.0], true);
        let mut p1 = Tensor::from_vec(vec![3.0], true);
        p0.set_grad(arr1(&[0.1, 0.2]));
        p1.set_grad(arr1(&[0.1]));

        let norm = clip_grad_norm(&mut [&mut p0, &mut p1], 1.0);
        assert_abs_diff_eq!(norm, 0.245, epsilon = 1e-3);
        assert_abs_diff_eq!(p0.grad().unwrap()[0], 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_above_threshold_scaled() {
        let mut p0 = Tensor::from_vec(vec![1.0, 2.0], true);
        p0.set_grad(arr1(&[3.0, 4.0])); // norm = 5

        let norm = clip_grad_norm(&mut [&mut p0], 1.0);
        assert_abs_diff_eq!(norm, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p0.grad().unwrap()[0], 0.6, epsilon = 1e-6);
        assert_abs_diff_eq!(p0.grad().unwrap()[1], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_relative_magnitudes_preserved() {
        let mut p0 = Tensor::from_vec(vec![1.0], true);
        let mut p1 = Tensor::from_vec(vec![1.0], true);
        p0.set_grad(arr1(&[10.0]));
        p1.set_grad(arr1(&[5.0]));

        clip_grad_norm(&mut [&mut p0, &mut p1], 1.0);

        let ratio = p0.grad().unwrap()[0] / p1.grad().unwrap()[0];
        assert_abs_diff_eq!(ratio, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_no_gradients_zero_norm() {
        let mut p0 = Tensor::from_vec(vec![1.0], false);
        let norm = clip_grad_norm(&mut [&mut p0], 1.0);
        assert_abs_diff_eq!(norm, 0.0, epsilon = 1e-6);
    }
}
