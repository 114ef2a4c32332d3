//! Per-split sample container
//!
//! Wraps one [`DatasetSplit`] with an asset-resolution root. Construction is
//! a data-quality filter: examples whose backing file does not exist are
//! dropped once, up front, with a reported count. Per-access decode failures
//! are a different animal — transient corruption must never abort a training
//! batch, so a failed decode yields the transform's black placeholder tensor
//! instead of an error.

use ndarray::Array3;
use std::path::PathBuf;

use super::split::{DatasetSplit, SplitName};
use crate::model::transform::ImageTransform;

/// Metadata carried alongside every sample for debugging and analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleMeta {
    pub asset_id: u64,
    /// Pre-normalization derived score on the 1–10 scale.
    pub original_score: f32,
    /// Total vote mass behind the label (0 when absent).
    pub total_votes: f32,
}

/// Indexed access to (input tensor, target score, metadata) triples.
pub struct SampleSource {
    split: DatasetSplit,
    images_root: PathBuf,
    transform: ImageTransform,
    dropped: usize,
}

impl SampleSource {
    /// Build a source over a split, dropping examples with missing assets.
    pub fn new(
        mut split: DatasetSplit,
        images_root: impl Into<PathBuf>,
        transform: ImageTransform,
    ) -> Self {
        let images_root = images_root.into();
        let before = split.examples.len();
        split
            .examples
            .retain(|e| images_root.join(format!("{}.jpg", e.asset_id)).exists());
        let dropped = before - split.examples.len();
        if dropped > 0 {
            eprintln!(
                "Warning: {dropped} image files not found for {} split",
                split.name.as_str()
            );
        }

        Self {
            split,
            images_root,
            transform,
            dropped,
        }
    }

    /// Number of usable samples.
    pub fn len(&self) -> usize {
        self.split.examples.len()
    }

    /// True when no backing assets survived filtering.
    pub fn is_empty(&self) -> bool {
        self.split.examples.is_empty()
    }

    /// How many examples were dropped for missing assets at construction.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Which split this source serves.
    pub fn name(&self) -> SplitName {
        self.split.name
    }

    /// Fetch one sample. Decode failure substitutes the placeholder tensor;
    /// this method does not fail.
    pub fn get(&self, index: usize) -> (Array3<f32>, f32, SampleMeta) {
        let example = &self.split.examples[index];
        let path = self.images_root.join(format!("{}.jpg", example.asset_id));

        let tensor = match self.transform.load_path(&path) {
            Ok(tensor) => tensor,
            Err(e) => {
                eprintln!("Warning: {e}; substituting placeholder");
                self.transform.placeholder()
            }
        };

        let meta = SampleMeta {
            asset_id: example.asset_id,
            original_score: example.derived_score,
            total_votes: example.total_votes,
        };

        (tensor, example.target_score, meta)
    }

    /// Target scores for every sample, in index order.
    pub fn targets(&self) -> Vec<f32> {
        self.split.examples.iter().map(|e| e.target_score).collect()
    }
}
