//! Checkpoint records
//!
//! Two files per run: `latest_checkpoint.json`, overwritten after every
//! epoch, and `best_model.json`, overwritten only when the validation loss
//! hits a new minimum. A checkpoint restores the run verbatim: learner
//! parameters, optimizer moments, scheduler position, histories, and the
//! configuration that produced them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Learner, ModelInfo};
use crate::optim::{OptimizerState, SchedulerState};
use crate::train::TrainConfig;

/// File name of the per-epoch checkpoint.
pub const LATEST_CHECKPOINT: &str = "latest_checkpoint.json";
/// File name of the best-validation-loss checkpoint.
pub const BEST_CHECKPOINT: &str = "best_model.json";

/// Shape and flags of one persisted parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterRecord {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    pub requires_grad: bool,
}

/// Flattened learner parameters with their layout records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerSnapshot {
    pub parameters: Vec<ParameterRecord>,
    pub data: Vec<f32>,
}

impl LearnerSnapshot {
    /// Capture the learner's current parameters.
    pub fn capture(learner: &dyn Learner) -> Self {
        let mut data = Vec::new();
        let parameters = learner
            .parameters()
            .into_iter()
            .enumerate()
            .map(|(i, tensor)| {
                data.extend(tensor.data().iter().copied());
                ParameterRecord {
                    name: format!("param_{i}"),
                    shape: vec![tensor.len()],
                    dtype: "f32".to_string(),
                    requires_grad: tensor.requires_grad(),
                }
            })
            .collect();
        Self { parameters, data }
    }

    /// Write the snapshot back into a live learner.
    pub fn restore(&self, learner: &mut dyn Learner) -> Result<()> {
        let mut params = learner.parameters_mut();
        if params.len() != self.parameters.len() {
            return Err(Error::CheckpointIncompatible {
                reason: format!(
                    "checkpoint has {} parameter tensors, model has {}",
                    self.parameters.len(),
                    params.len()
                ),
            });
        }

        let mut offset = 0;
        for (param, record) in params.iter_mut().zip(&self.parameters) {
            let size: usize = record.shape.iter().product();
            if param.len() != size {
                return Err(Error::CheckpointIncompatible {
                    reason: format!(
                        "parameter '{}' has {} elements in the checkpoint, {} in the model",
                        record.name,
                        size,
                        param.len()
                    ),
                });
            }
            let slice = self.data.get(offset..offset + size).ok_or_else(|| {
                Error::CheckpointIncompatible {
                    reason: "checkpoint data buffer is shorter than its parameter records"
                        .to_string(),
                }
            })?;
            for (dst, &src) in param.data_mut().iter_mut().zip(slice) {
                *dst = src;
            }
            offset += size;
        }
        Ok(())
    }
}

/// One durable training snapshot, written after every epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Last completed epoch (0-based); resume continues at `epoch + 1`.
    pub epoch: usize,
    pub learner: LearnerSnapshot,
    pub optimizer: OptimizerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduler: Option<SchedulerState>,
    pub best_val_loss: Option<f32>,
    pub train_losses: Vec<f32>,
    pub val_losses: Vec<f32>,
    pub config: TrainConfig,
    pub model_info: ModelInfo,
}

impl Checkpoint {
    /// Verify the checkpoint's model-defining fields against the live model.
    pub fn check_compatible(&self, info: &ModelInfo) -> Result<()> {
        if self.model_info.backbone != info.backbone {
            return Err(Error::CheckpointIncompatible {
                reason: format!(
                    "checkpoint backbone '{}' does not match configured backbone '{}'",
                    self.model_info.backbone, info.backbone
                ),
            });
        }
        if self.model_info.num_outputs != info.num_outputs {
            return Err(Error::CheckpointIncompatible {
                reason: format!(
                    "checkpoint has {} output(s), model has {}",
                    self.model_info.num_outputs, info.num_outputs
                ),
            });
        }
        Ok(())
    }
}

/// Persist a checkpoint. Failure here is fatal to the run.
pub fn save_checkpoint(checkpoint: &Checkpoint, path: impl AsRef<Path>) -> Result<()> {
    super::write_json(path, checkpoint, "writing checkpoint")
}

/// Load a checkpoint from disk.
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<Checkpoint> {
    super::read_json(path, "reading checkpoint")
}
