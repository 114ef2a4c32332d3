//! Training run state
//!
//! One owned value, mutated once per epoch by the orchestrator and serialized
//! into every checkpoint. Checkpointing is the only serialize/deserialize
//! boundary — there is no ambient global state.

use serde::{Deserialize, Serialize};

/// Accumulated run state: epoch counter, best validation loss, histories.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrainingState {
    /// Last completed epoch (0-based). Meaningless until the first epoch
    /// finishes.
    pub epoch: usize,
    /// Minimum validation loss observed so far; `None` before any epoch.
    pub best_val_loss: Option<f32>,
    pub train_losses: Vec<f32>,
    pub val_losses: Vec<f32>,
    pub learning_rates: Vec<f32>,
}

impl TrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an epoch's outcome. Returns true when the validation loss is a
    /// new minimum.
    pub fn record_epoch(&mut self, epoch: usize, train_loss: f32, val_loss: f32, lr: f32) -> bool {
        self.epoch = epoch;
        self.train_losses.push(train_loss);
        self.val_losses.push(val_loss);
        self.learning_rates.push(lr);

        let is_best = self.best_val_loss.map_or(true, |best| val_loss < best);
        if is_best {
            self.best_val_loss = Some(val_loss);
        }
        is_best
    }

    /// Number of completed epochs in the histories.
    pub fn epochs_recorded(&self) -> usize {
        self.val_losses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_epoch_is_best() {
        let mut state = TrainingState::new();
        assert!(state.record_epoch(0, 1.0, 0.9, 1e-4));
        assert_eq!(state.best_val_loss, Some(0.9));
    }

    #[test]
    fn test_best_only_updates_on_improvement() {
        let mut state = TrainingState::new();
        state.record_epoch(0, 1.0, 0.9, 1e-4);
        assert!(!state.record_epoch(1, 0.8, 0.95, 1e-4));
        assert_eq!(state.best_val_loss, Some(0.9));
        assert!(state.record_epoch(2, 0.7, 0.5, 1e-4));
        assert_eq!(state.best_val_loss, Some(0.5));
    }

    #[test]
    fn test_histories_grow_together() {
        let mut state = TrainingState::new();
        state.record_epoch(0, 1.0, 0.9, 1e-4);
        state.record_epoch(1, 0.8, 0.7, 1e-4);
        assert_eq!(state.epochs_recorded(), 2);
        assert_eq!(state.train_losses.len(), 2);
        assert_eq!(state.learning_rates.len(), 2);
        assert_eq!(state.epoch, 1);
    }

    #[test]
    fn test_serializes_without_best() {
        // Option<f32> keeps the JSON well-formed before the first epoch.
        let state = TrainingState::new();
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"best_val_loss\":null"));
    }
}
