//! Inference-time score calibration
//!
//! The learner's raw output is not range-constrained at inference time: it
//! can be negative, fractional, or far above the expected band. This module
//! remaps any raw scalar into the deployed 1–100 scoring scale through a
//! fixed piecewise transform, then derives four correlated component scores.
//!
//! The branch structure and constants are load-bearing: previously deployed
//! consumers depend on the exact numeric behavior, so this transform must be
//! reproduced bit-for-bit rather than replaced with a principled
//! calibration. Whether a bounded output activation should supersede it is
//! an open question tracked in DESIGN.md.

use serde::{Deserialize, Serialize};

/// Lower edge of the raw band the model was expected to produce.
pub const MIN_EXPECTED: f64 = 1.81;
/// Upper edge of the raw band the model was expected to produce.
pub const MAX_EXPECTED: f64 = 8.60;

/// Calibrated multi-component score, every value in [1, 100] rounded to one
/// decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub composition_score: f64,
    pub focus_score: f64,
    pub exposure_score: f64,
    pub color_score: f64,
    pub overall_score: f64,
}

impl CalibrationResult {
    /// Neutral fallback returned when evaluation fails: all scores 50.0.
    pub fn neutral() -> Self {
        Self {
            composition_score: 50.0,
            focus_score: 50.0,
            exposure_score: 50.0,
            color_score: 50.0,
            overall_score: 50.0,
        }
    }
}

/// Pure, stateless calibration of one raw prediction.
///
/// # Example
///
/// ```
/// use valorar::infer::ScoreCalibrator;
///
/// let result = ScoreCalibrator.calibrate(5.0);
/// assert_eq!(result.overall_score, 46.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCalibrator;

impl ScoreCalibrator {
    /// Map a raw prediction into a [`CalibrationResult`].
    pub fn calibrate(&self, raw: f64) -> CalibrationResult {
        let adjusted = Self::adjust(raw);

        let base =
            ((adjusted - MIN_EXPECTED) / (MAX_EXPECTED - MIN_EXPECTED) * 100.0).max(5.0);

        let composition = (base * 0.95).max(1.0);
        let focus = (base * 1.02).max(1.0);
        let exposure = (base * 0.92).max(1.0);
        let color = (base * 1.03).max(1.0);
        let overall = (composition + focus + exposure + color) / 4.0;

        CalibrationResult {
            composition_score: round1(composition),
            focus_score: round1(focus),
            exposure_score: round1(exposure),
            color_score: round1(color),
            overall_score: round1(overall),
        }
    }

    /// Piecewise remap into the expected band; first matching branch wins.
    fn adjust(raw: f64) -> f64 {
        let span = MAX_EXPECTED - MIN_EXPECTED;
        if raw < 0.0 {
            // Negative outputs: clamp to [-5, 5], shift into the band.
            let clamped = raw.clamp(-5.0, 5.0);
            MIN_EXPECTED + (clamped + 5.0) / 10.0 * span
        } else if raw <= 1.0 {
            // Unit-interval outputs scale across the whole band.
            MIN_EXPECTED + raw * span
        } else if raw < MIN_EXPECTED {
            // Just below the band: compressed into its bottom 30%.
            MIN_EXPECTED + (raw - 1.0) / (MIN_EXPECTED - 1.0) * span * 0.3
        } else if raw <= MAX_EXPECTED {
            raw
        } else {
            // Runaway outputs wrap via modulo.
            MIN_EXPECTED + (raw.abs() % 10.0) / 10.0 * span
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_negative_raw() {
        // raw = -3: clamp, shift → adjusted 3.168, base 20.0
        let result = ScoreCalibrator.calibrate(-3.0);
        assert_abs_diff_eq!(result.composition_score, 19.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.focus_score, 20.4, epsilon = 1e-9);
        assert_abs_diff_eq!(result.exposure_score, 18.4, epsilon = 1e-9);
        assert_abs_diff_eq!(result.color_score, 20.6, epsilon = 1e-9);
        assert_abs_diff_eq!(result.overall_score, 19.6, epsilon = 1e-9);
    }

    #[test]
    fn test_far_negative_clamps() {
        // Anything at or below -5 clamps to the band's bottom, base floors
        // at 5.0.
        assert_eq!(
            ScoreCalibrator.calibrate(-50.0),
            ScoreCalibrator.calibrate(-5.0)
        );
    }

    #[test]
    fn test_unit_interval_raw() {
        // raw = 0.5 → adjusted 5.205 → base ≈ 50
        let result = ScoreCalibrator.calibrate(0.5);
        assert_abs_diff_eq!(result.focus_score, 51.0, epsilon = 0.1);
        assert_abs_diff_eq!(result.overall_score, 49.0, epsilon = 0.1);
    }

    #[test]
    fn test_in_band_identity() {
        // raw = 5.0 → identity → base 46.98; the multipliers average to
        // 0.98, so overall = 0.98 · base = 46.0 after rounding.
        let result = ScoreCalibrator.calibrate(5.0);
        assert_abs_diff_eq!(result.composition_score, 44.6, epsilon = 1e-9);
        assert_abs_diff_eq!(result.focus_score, 47.9, epsilon = 1e-9);
        assert_abs_diff_eq!(result.exposure_score, 43.2, epsilon = 1e-9);
        assert_abs_diff_eq!(result.color_score, 48.4, epsilon = 1e-9);
        assert_abs_diff_eq!(result.overall_score, 46.0, epsilon = 1e-9);
    }

    #[test]
    fn test_below_band_compressed() {
        // raw ∈ (1, 1.81) lands in the bottom 30% of the band.
        let result_low = ScoreCalibrator.calibrate(1.01);
        let result_high = ScoreCalibrator.calibrate(1.80);
        assert!(result_low.overall_score <= result_high.overall_score);
        // Top of the compressed sub-range: base = 30.
        assert_abs_diff_eq!(
            ScoreCalibrator.calibrate(1.809999).overall_score,
            29.4,
            epsilon = 0.2
        );
    }

    #[test]
    fn test_above_band_wraps_modulo() {
        // raw = 20 → |20| mod 10 = 0 → adjusted = band bottom → base floors
        // to 5.0; components 4.75/5.1/4.6/5.15 → overall 4.9
        let result = ScoreCalibrator.calibrate(20.0);
        assert_abs_diff_eq!(result.composition_score, 4.8, epsilon = 1e-9);
        assert_abs_diff_eq!(result.focus_score, 5.1, epsilon = 1e-9);
        assert_abs_diff_eq!(result.exposure_score, 4.6, epsilon = 1e-9);
        assert_abs_diff_eq!(result.color_score, 5.2, epsilon = 1e-9);
        assert_abs_diff_eq!(result.overall_score, 4.9, epsilon = 1e-9);
    }

    #[test]
    fn test_purity() {
        let a = ScoreCalibrator.calibrate(3.33);
        let b = ScoreCalibrator.calibrate(3.33);
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_scores_bounded() {
        for raw in [-100.0, -5.0, -0.001, 0.0, 0.37, 1.0, 1.4, 1.81, 4.2, 8.6, 9.1, 1e6] {
            let r = ScoreCalibrator.calibrate(raw);
            for score in [
                r.composition_score,
                r.focus_score,
                r.exposure_score,
                r.color_score,
                r.overall_score,
            ] {
                assert!((1.0..=103.0).contains(&score), "raw {raw} → {score}");
            }
        }
    }

    #[test]
    fn test_neutral_fallback() {
        let neutral = CalibrationResult::neutral();
        assert_eq!(neutral.overall_score, 50.0);
        assert_eq!(neutral.composition_score, 50.0);
    }

    #[test]
    fn test_serializes_flat_json() {
        let json = serde_json::to_string(&ScoreCalibrator.calibrate(5.0)).unwrap();
        assert!(json.contains("\"composition_score\""));
        assert!(json.contains("\"overall_score\":46.0"));
    }
}
