//! Ground-truth CSV ingest
//!
//! The ground-truth file carries one row per image: `image_num` plus ten
//! `vote_1`..`vote_10` columns holding per-rating vote fractions. Rows are
//! deserialized with serde and labeled immediately; a row with an empty
//! histogram fails the whole load, since corrupt ground truth should stop a
//! run before any epoch burns compute.

use std::path::Path;

use serde::Deserialize;

use super::normalize::{ScoreNormalizer, NUM_RATINGS};
use crate::error::{Error, Result};

/// One labeled training example.
#[derive(Debug, Clone)]
pub struct LabeledExample {
    /// Asset identifier; resolves to `<images_root>/<asset_id>.jpg`.
    pub asset_id: u64,
    /// Per-rating vote fractions for ratings 1..=10.
    pub votes: [f32; NUM_RATINGS],
    /// Rating-weighted sum on the 1–10 scale.
    pub derived_score: f32,
    /// Derived score rescaled onto the configured target range.
    pub target_score: f32,
    /// Sum of the ten vote columns (0 when the row carried none).
    pub total_votes: f32,
}

#[derive(Debug, Deserialize)]
struct GroundTruthRow {
    image_num: u64,
    vote_1: f32,
    vote_2: f32,
    vote_3: f32,
    vote_4: f32,
    vote_5: f32,
    vote_6: f32,
    vote_7: f32,
    vote_8: f32,
    vote_9: f32,
    vote_10: f32,
}

impl GroundTruthRow {
    fn votes(&self) -> [f32; NUM_RATINGS] {
        [
            self.vote_1,
            self.vote_2,
            self.vote_3,
            self.vote_4,
            self.vote_5,
            self.vote_6,
            self.vote_7,
            self.vote_8,
            self.vote_9,
            self.vote_10,
        ]
    }
}

/// Load and label the full ground-truth set.
pub fn load_ground_truth(
    csv_path: impl AsRef<Path>,
    normalizer: &ScoreNormalizer,
) -> Result<Vec<LabeledExample>> {
    let csv_path = csv_path.as_ref();
    let mut reader = csv::Reader::from_path(csv_path).map_err(|e| Error::Dataset {
        context: format!("failed to open {}: {e}", csv_path.display()),
    })?;

    let mut examples = Vec::new();
    for row in reader.deserialize::<GroundTruthRow>() {
        let row = row.map_err(|e| Error::Dataset {
            context: format!("failed to parse row in {}: {e}", csv_path.display()),
        })?;

        let votes = row.votes();
        let derived_score = ScoreNormalizer::derived_score(row.image_num, &votes)?;
        examples.push(LabeledExample {
            asset_id: row.image_num,
            votes,
            derived_score,
            target_score: normalizer.normalize(derived_score),
            total_votes: votes.iter().sum(),
        });
    }

    if examples.is_empty() {
        return Err(Error::Dataset {
            context: format!("{} contains no examples", csv_path.display()),
        });
    }

    Ok(examples)
}
