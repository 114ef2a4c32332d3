//! Validation metrics

use ndarray::Array1;

/// Mean absolute error between predictions and targets.
pub fn mean_absolute_error(predictions: &Array1<f32>, targets: &Array1<f32>) -> f32 {
    assert_eq!(predictions.len(), targets.len());
    if predictions.is_empty() {
        return 0.0;
    }
    predictions
        .iter()
        .zip(targets.iter())
        .map(|(&p, &y)| (p - y).abs())
        .sum::<f32>()
        / predictions.len() as f32
}

/// Pearson correlation coefficient. Returns 0 when either side has no
/// variance, so degenerate validation batches never poison the metrics log.
pub fn pearson_correlation(predictions: &Array1<f32>, targets: &Array1<f32>) -> f32 {
    assert_eq!(predictions.len(), targets.len());
    let n = predictions.len();
    if n < 2 {
        return 0.0;
    }

    let mean_p = predictions.sum() / n as f32;
    let mean_y = targets.sum() / n as f32;

    let mut cov = 0.0f32;
    let mut var_p = 0.0f32;
    let mut var_y = 0.0f32;
    for (&p, &y) in predictions.iter().zip(targets.iter()) {
        let dp = p - mean_p;
        let dy = y - mean_y;
        cov += dp * dy;
        var_p += dp * dp;
        var_y += dy * dy;
    }

    if var_p == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_p.sqrt() * var_y.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn test_mae() {
        let mae = mean_absolute_error(&arr1(&[1.0, 2.0, 3.0]), &arr1(&[1.5, 2.5, 3.5]));
        assert_abs_diff_eq!(mae, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_mae_empty() {
        let mae = mean_absolute_error(&arr1(&[]), &arr1(&[]));
        assert_abs_diff_eq!(mae, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_pearson_perfect_positive() {
        let corr = pearson_correlation(&arr1(&[1.0, 2.0, 3.0]), &arr1(&[10.0, 20.0, 30.0]));
        assert_abs_diff_eq!(corr, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let corr = pearson_correlation(&arr1(&[3.0, 2.0, 1.0]), &arr1(&[10.0, 20.0, 30.0]));
        assert_abs_diff_eq!(corr, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_pearson_constant_input_is_zero() {
        let corr = pearson_correlation(&arr1(&[5.0, 5.0, 5.0]), &arr1(&[1.0, 2.0, 3.0]));
        assert_abs_diff_eq!(corr, 0.0, epsilon = 1e-9);
    }
}
