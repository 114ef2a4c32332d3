//! Vote-histogram score normalization
//!
//! Ground-truth aesthetic labels arrive as ten-bucket vote histograms
//! (ratings 1 through 10). The derived score is the rating-weighted sum of
//! the buckets — NOT divided by the vote total; the ground-truth CSV stores
//! per-rating vote fractions, so the sum already lands on the 1–10 scale.
//! Deployed models were trained against exactly this derivation, so it must
//! not be "corrected" into a true mean.

use crate::error::{Error, Result};

/// Number of rating buckets in a vote histogram.
pub const NUM_RATINGS: usize = 10;

/// Converts raw vote histograms into a target score on a configured range.
///
/// # Example
///
/// ```
/// use valorar::data::ScoreNormalizer;
///
/// let normalizer = ScoreNormalizer::default(); // target range [0, 100]
/// let mut votes = [0.0f32; 10];
/// votes[4] = 1.0; // every vote at rating 5
///
/// let derived = ScoreNormalizer::derived_score(1, &votes).unwrap();
/// assert!((derived - 5.0).abs() < 1e-6);
///
/// let target = normalizer.normalize(derived);
/// assert!((target - 44.444447).abs() < 1e-3); // (5-1)/9 * 100
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScoreNormalizer {
    min_target: f32,
    max_target: f32,
}

impl Default for ScoreNormalizer {
    fn default() -> Self {
        Self::new(0.0, 100.0)
    }
}

impl ScoreNormalizer {
    /// Create a normalizer for the given target range.
    pub fn new(min_target: f32, max_target: f32) -> Self {
        Self {
            min_target,
            max_target,
        }
    }

    /// Rating-weighted sum of the histogram: Σ rating·votes[rating].
    ///
    /// Fails with [`Error::InvalidHistogram`] when all ten counts are zero,
    /// since no votes means no defined score.
    pub fn derived_score(asset_id: u64, votes: &[f32; NUM_RATINGS]) -> Result<f32> {
        if votes.iter().all(|&v| v == 0.0) {
            return Err(Error::InvalidHistogram { asset_id });
        }
        let score = votes
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f32 + 1.0) * v)
            .sum();
        Ok(score)
    }

    /// Affine map from the 1–10 derived scale onto the target range.
    pub fn normalize(&self, derived: f32) -> f32 {
        self.min_target + (derived - 1.0) / 9.0 * (self.max_target - self.min_target)
    }

    /// Lower bound of the target range.
    pub fn min_target(&self) -> f32 {
        self.min_target
    }

    /// Upper bound of the target range.
    pub fn max_target(&self) -> f32 {
        self.max_target
    }
}
