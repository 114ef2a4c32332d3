//! Dataset preparation: score normalization, stratified splits, sample access
//!
//! Data flows `CSV → ScoreNormalizer → StratifiedSplitter → SampleSource →
//! BatchLoader`. Everything downstream of the CSV is deterministic for a
//! fixed seed.

mod loader;
mod normalize;
mod records;
mod source;
mod split;

pub use loader::{Batch, BatchIter, BatchLoader};
pub use normalize::{ScoreNormalizer, NUM_RATINGS};
pub use records::{load_ground_truth, LabeledExample};
pub use source::{SampleMeta, SampleSource};
pub use split::{
    DatasetSplit, ScoreBin, SplitName, SplitStats, SplitSummary, StratifiedSplitter,
    HIGH_QUALITY_THRESHOLD, LOW_QUALITY_THRESHOLD,
};
