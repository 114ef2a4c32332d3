//! Stratified train/validation/test partitioning
//!
//! Partitions preserve the score distribution by bucketing every example
//! into one of five score bins and sampling each bin independently. The
//! split is performed in two seeded stages — train vs holdout, then holdout
//! into val vs test with bins recomputed on the holdout subset — so the
//! three outputs partition the source set exactly, and identical input plus
//! identical seed reproduces identical membership.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::records::LabeledExample;
use crate::error::{Error, Result};

/// Derived score above which an example counts as high quality.
pub const HIGH_QUALITY_THRESHOLD: f32 = 7.0;
/// Derived score below which an example counts as low quality.
pub const LOW_QUALITY_THRESHOLD: f32 = 4.0;

/// Score bucket used only for stratification; never persisted as a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBin {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ScoreBin {
    /// All bins in fixed label order. Partitioning iterates in this order so
    /// membership is independent of input ordering quirks.
    pub const ALL: [ScoreBin; 5] = [
        ScoreBin::VeryLow,
        ScoreBin::Low,
        ScoreBin::Medium,
        ScoreBin::High,
        ScoreBin::VeryHigh,
    ];

    /// Bucket a derived score by the fixed thresholds
    /// (1.0,3.5], (3.5,4.5], (4.5,5.5], (5.5,6.5], (6.5,10.0].
    pub fn classify(derived_score: f32) -> ScoreBin {
        if derived_score <= 3.5 {
            ScoreBin::VeryLow
        } else if derived_score <= 4.5 {
            ScoreBin::Low
        } else if derived_score <= 5.5 {
            ScoreBin::Medium
        } else if derived_score <= 6.5 {
            ScoreBin::High
        } else {
            ScoreBin::VeryHigh
        }
    }

    /// Human-readable bin label.
    pub fn label(self) -> &'static str {
        match self {
            ScoreBin::VeryLow => "very_low",
            ScoreBin::Low => "low",
            ScoreBin::Medium => "medium",
            ScoreBin::High => "high",
            ScoreBin::VeryHigh => "very_high",
        }
    }
}

/// Which of the three splits a [`DatasetSplit`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitName {
    Train,
    Val,
    Test,
}

impl SplitName {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitName::Train => "train",
            SplitName::Val => "val",
            SplitName::Test => "test",
        }
    }
}

/// One output partition with its examples in ascending source order.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub name: SplitName,
    pub examples: Vec<LabeledExample>,
}

impl DatasetSplit {
    /// Summary statistics over the split's derived scores.
    pub fn stats(&self, total: usize) -> SplitStats {
        let n = self.examples.len();
        let mean = if n == 0 {
            0.0
        } else {
            self.examples.iter().map(|e| e.derived_score).sum::<f32>() / n as f32
        };
        // Sample standard deviation (ddof = 1), matching the persisted
        // summaries this record replaces.
        let std = if n < 2 {
            0.0
        } else {
            let ss: f32 = self
                .examples
                .iter()
                .map(|e| (e.derived_score - mean).powi(2))
                .sum();
            (ss / (n as f32 - 1.0)).sqrt()
        };

        SplitStats {
            split: self.name.as_str().to_string(),
            size: n,
            percentage: if total == 0 {
                0.0
            } else {
                n as f32 / total as f32 * 100.0
            },
            mean_score: mean,
            std_score: std,
            high_quality: self
                .examples
                .iter()
                .filter(|e| e.derived_score > HIGH_QUALITY_THRESHOLD)
                .count(),
            low_quality: self
                .examples
                .iter()
                .filter(|e| e.derived_score < LOW_QUALITY_THRESHOLD)
                .count(),
        }
    }
}

/// Per-split statistics persisted alongside the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitStats {
    pub split: String,
    pub size: usize,
    pub percentage: f32,
    pub mean_score: f32,
    pub std_score: f32,
    pub high_quality: usize,
    pub low_quality: usize,
}

/// Split summary record written as `split_info.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSummary {
    pub total_images: usize,
    pub train_size: usize,
    pub val_size: usize,
    pub test_size: usize,
    pub val_split: f32,
    pub test_split: f32,
    pub random_state: u64,
    pub splits_data: Vec<SplitStats>,
}

/// Seeded two-stage stratified splitter.
///
/// # Example
///
/// ```
/// use valorar::data::{LabeledExample, StratifiedSplitter};
///
/// let examples: Vec<LabeledExample> = (0..100)
///     .map(|i| {
///         let mut votes = [0.0f32; 10];
///         votes[(i % 10) as usize] = 1.0;
///         let derived = (i % 10) as f32 + 1.0;
///         LabeledExample {
///             asset_id: i,
///             votes,
///             derived_score: derived,
///             target_score: (derived - 1.0) / 9.0 * 100.0,
///             total_votes: 1.0,
///         }
///     })
///     .collect();
///
/// let splitter = StratifiedSplitter::new(0.15, 0.15, 42).unwrap();
/// let (train, val, test) = splitter.split(&examples).unwrap();
/// assert_eq!(train.examples.len() + val.examples.len() + test.examples.len(), 100);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StratifiedSplitter {
    val_fraction: f32,
    test_fraction: f32,
    seed: u64,
}

impl StratifiedSplitter {
    /// Create a splitter. Fractions must be positive and sum below 1.
    pub fn new(val_fraction: f32, test_fraction: f32, seed: u64) -> Result<Self> {
        if val_fraction <= 0.0 || test_fraction <= 0.0 || val_fraction + test_fraction >= 1.0 {
            return Err(Error::UnsupportedConfig {
                field: "val_split/test_split",
                value: format!("{val_fraction}/{test_fraction}"),
                supported: "positive fractions with val_split + test_split < 1",
            });
        }
        Ok(Self {
            val_fraction,
            test_fraction,
            seed,
        })
    }

    /// Partition the examples into disjoint train/val/test splits.
    pub fn split(
        &self,
        examples: &[LabeledExample],
    ) -> Result<(DatasetSplit, DatasetSplit, DatasetSplit)> {
        let holdout_fraction = self.val_fraction + self.test_fraction;
        let all_indices: Vec<usize> = (0..examples.len()).collect();

        // Stage 1: train vs holdout, stratified over the full set.
        let (mut train_idx, holdout_idx) =
            stratified_partition(examples, &all_indices, holdout_fraction, self.seed)?;

        // Stage 2: val vs test within the holdout, bins recomputed on the
        // holdout subset, same seed for reproducibility.
        let relative_test = self.test_fraction / holdout_fraction;
        let (mut val_idx, mut test_idx) =
            stratified_partition(examples, &holdout_idx, relative_test, self.seed)?;

        train_idx.sort_unstable();
        val_idx.sort_unstable();
        test_idx.sort_unstable();

        let collect = |name: SplitName, idx: &[usize]| DatasetSplit {
            name,
            examples: idx.iter().map(|&i| examples[i].clone()).collect(),
        };

        Ok((
            collect(SplitName::Train, &train_idx),
            collect(SplitName::Val, &val_idx),
            collect(SplitName::Test, &test_idx),
        ))
    }

    /// Split and build the persisted summary record in one pass.
    pub fn split_with_summary(
        &self,
        examples: &[LabeledExample],
    ) -> Result<(DatasetSplit, DatasetSplit, DatasetSplit, SplitSummary)> {
        let (train, val, test) = self.split(examples)?;
        let total = examples.len();
        let summary = SplitSummary {
            total_images: total,
            train_size: train.examples.len(),
            val_size: val.examples.len(),
            test_size: test.examples.len(),
            val_split: self.val_fraction,
            test_split: self.test_fraction,
            random_state: self.seed,
            splits_data: vec![train.stats(total), val.stats(total), test.stats(total)],
        };
        Ok((train, val, test, summary))
    }
}

/// Split `indices` into (kept, taken) where `taken` receives `take_fraction`
/// of every score bin, rounded to the nearest integer.
///
/// A nonempty bin that would land empty on either side is an error: dropping
/// it silently would skew the score distribution the split exists to
/// preserve.
fn stratified_partition(
    examples: &[LabeledExample],
    indices: &[usize],
    take_fraction: f32,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut kept = Vec::new();
    let mut taken = Vec::new();

    for bin in ScoreBin::ALL {
        let mut members: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| ScoreBin::classify(examples[i].derived_score) == bin)
            .collect();
        if members.is_empty() {
            continue;
        }

        let take = (members.len() as f32 * take_fraction).round() as usize;
        if take == 0 || take == members.len() {
            return Err(Error::InsufficientBinSize {
                bin: bin.label().to_string(),
                size: members.len(),
            });
        }

        members.shuffle(&mut rng);
        taken.extend_from_slice(&members[..take]);
        kept.extend_from_slice(&members[take..]);
    }

    Ok((kept, taken))
}
