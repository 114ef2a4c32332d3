//! Serving boundary
//!
//! Loads a trained checkpoint once and scores images on demand. The boundary
//! never throws past itself: any internal failure — unreadable file,
//! undecodable bytes, a poisoned prediction — becomes an `error` field plus
//! the neutral fallback scores, so callers always receive a well-formed
//! result. Evaluation holds no mutable state, so one evaluator serves
//! concurrent requests.

use serde::Serialize;
use std::path::Path;

use super::calibrate::{CalibrationResult, ScoreCalibrator};
use crate::error::Result;
use crate::io::load_checkpoint;
use crate::model::{AestheticModel, ImageTransform, Learner};

/// Always-well-formed evaluation response.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub scores: CalibrationResult,
}

impl EvaluationReport {
    /// Neutral fallback carrying the failure message.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            scores: CalibrationResult::neutral(),
        }
    }
}

/// Checkpoint-backed image scorer.
pub struct Evaluator {
    learner: AestheticModel,
    transform: ImageTransform,
    calibrator: ScoreCalibrator,
}

impl Evaluator {
    /// Rebuild the learner recorded in a checkpoint and restore its
    /// parameters.
    pub fn from_checkpoint(path: impl AsRef<Path>) -> Result<Self> {
        let checkpoint = load_checkpoint(path)?;

        let backbone = checkpoint.model_info.backbone.parse()?;
        let mut learner = AestheticModel::new(
            backbone,
            checkpoint.model_info.pretrained,
            checkpoint.config.random_seed,
        );
        checkpoint.check_compatible(&learner.info())?;
        checkpoint.learner.restore(&mut learner)?;

        Ok(Self {
            learner,
            transform: ImageTransform,
            calibrator: ScoreCalibrator,
        })
    }

    /// Score an image file. Never fails; errors travel inside the report.
    pub fn evaluate_path(&self, path: impl AsRef<Path>) -> EvaluationReport {
        match self.try_evaluate_path(path.as_ref()) {
            Ok(scores) => EvaluationReport {
                error: None,
                scores,
            },
            Err(e) => EvaluationReport::failed(format!("Image evaluation error: {e}")),
        }
    }

    /// Score raw image bytes. Never fails; errors travel inside the report.
    pub fn evaluate_bytes(&self, bytes: &[u8]) -> EvaluationReport {
        match self.try_evaluate_bytes(bytes) {
            Ok(scores) => EvaluationReport {
                error: None,
                scores,
            },
            Err(e) => EvaluationReport::failed(format!("Image evaluation error: {e}")),
        }
    }

    fn try_evaluate_path(&self, path: &Path) -> Result<CalibrationResult> {
        let tensor = self.transform.load_path(path)?;
        Ok(self.score(tensor))
    }

    fn try_evaluate_bytes(&self, bytes: &[u8]) -> Result<CalibrationResult> {
        let tensor = self.transform.load_bytes(bytes)?;
        Ok(self.score(tensor))
    }

    fn score(&self, tensor: ndarray::Array3<f32>) -> CalibrationResult {
        let predictions = self.learner.forward_inference(std::slice::from_ref(&tensor));
        let raw = predictions[0] as f64;
        self.calibrator.calibrate(raw)
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator").finish_non_exhaustive()
    }
}
