//! Optimizer trait and serializable optimizer state

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// Trait for optimization algorithms.
///
/// Parameters arrive as mutable references borrowed from the learner, so the
/// optimizer never owns parameter state — it only owns its own moments.
pub trait Optimizer: Send {
    /// Perform a single optimization step over the borrowed parameters.
    fn step(&mut self, params: &mut [&mut Tensor]);

    /// Zero out all gradients.
    fn zero_grad(&mut self, params: &mut [&mut Tensor]) {
        for param in params.iter_mut() {
            param.zero_grad();
        }
    }

    /// Get learning rate.
    fn lr(&self) -> f32;

    /// Set learning rate.
    fn set_lr(&mut self, lr: f32);

    /// Snapshot internal state for checkpointing.
    fn state(&self) -> OptimizerState;

    /// Restore internal state from a checkpoint snapshot.
    fn load_state(&mut self, state: &OptimizerState) -> Result<()>;
}

/// Serializable optimizer internals, persisted in every checkpoint so a
/// resumed run continues with identical moment estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerState {
    Adam {
        lr: f32,
        step: u64,
        first_moment: Vec<Vec<f32>>,
        second_moment: Vec<Vec<f32>>,
    },
    Sgd {
        lr: f32,
        velocities: Vec<Vec<f32>>,
    },
}

impl OptimizerState {
    /// Human-readable tag, used in incompatibility diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerState::Adam { .. } => "adam",
            OptimizerState::Sgd { .. } => "sgd",
        }
    }
}

pub(crate) fn state_mismatch(expected: &'static str, state: &OptimizerState) -> Error {
    Error::CheckpointIncompatible {
        reason: format!(
            "optimizer state is '{}' but the configured optimizer is '{expected}'",
            state.kind()
        ),
    }
}
