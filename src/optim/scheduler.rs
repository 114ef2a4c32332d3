//! Learning rate schedulers
//!
//! Resolved once at setup from the configured tag. Plateau scheduling
//! consumes the validation loss; cosine annealing steps unconditionally.
//! Both serialize their internals so a resumed run continues the schedule
//! instead of restarting it.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use super::optimizer::Optimizer;
use crate::error::{Error, Result};

/// Serializable scheduler internals for checkpointing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulerState {
    ReduceOnPlateau {
        best: Option<f32>,
        num_bad_epochs: usize,
    },
    Cosine {
        current_step: usize,
    },
}

/// Learning rate schedule, stepped once per epoch.
pub enum Scheduler {
    ReduceOnPlateau(ReduceOnPlateau),
    Cosine(CosineAnnealing),
}

impl Scheduler {
    /// Advance the schedule by one epoch. Plateau variants react to the
    /// validation loss; others ignore it.
    pub fn step(&mut self, val_loss: f32, optimizer: &mut dyn Optimizer) {
        match self {
            Scheduler::ReduceOnPlateau(s) => s.step(val_loss, optimizer),
            Scheduler::Cosine(s) => s.step(optimizer),
        }
    }

    /// Snapshot for checkpointing.
    pub fn state(&self) -> SchedulerState {
        match self {
            Scheduler::ReduceOnPlateau(s) => SchedulerState::ReduceOnPlateau {
                best: s.best,
                num_bad_epochs: s.num_bad_epochs,
            },
            Scheduler::Cosine(s) => SchedulerState::Cosine {
                current_step: s.current_step,
            },
        }
    }

    /// Restore from a checkpoint snapshot.
    pub fn load_state(&mut self, state: &SchedulerState) -> Result<()> {
        match (self, state) {
            (
                Scheduler::ReduceOnPlateau(s),
                SchedulerState::ReduceOnPlateau {
                    best,
                    num_bad_epochs,
                },
            ) => {
                s.best = *best;
                s.num_bad_epochs = *num_bad_epochs;
                Ok(())
            }
            (Scheduler::Cosine(s), SchedulerState::Cosine { current_step }) => {
                s.current_step = *current_step;
                Ok(())
            }
            _ => Err(Error::CheckpointIncompatible {
                reason: "scheduler state does not match the configured scheduler".to_string(),
            }),
        }
    }
}

/// Halve the learning rate after `patience` epochs without improvement.
///
/// Improvement is relative: a loss below `best * (1 - threshold)` resets the
/// bad-epoch counter.
pub struct ReduceOnPlateau {
    factor: f32,
    patience: usize,
    threshold: f32,
    best: Option<f32>,
    num_bad_epochs: usize,
}

impl ReduceOnPlateau {
    pub fn new(factor: f32, patience: usize) -> Self {
        Self {
            factor,
            patience,
            threshold: 1e-4,
            best: None,
            num_bad_epochs: 0,
        }
    }

    fn step(&mut self, val_loss: f32, optimizer: &mut dyn Optimizer) {
        let improved = match self.best {
            None => true,
            Some(best) => val_loss < best * (1.0 - self.threshold),
        };

        if improved {
            self.best = Some(val_loss);
            self.num_bad_epochs = 0;
        } else {
            self.num_bad_epochs += 1;
            if self.num_bad_epochs > self.patience {
                optimizer.set_lr(optimizer.lr() * self.factor);
                self.num_bad_epochs = 0;
            }
        }
    }
}

/// Cosine annealing from the base rate toward `lr_min` over `t_max` epochs.
///
/// lr_t = lr_min + 0.5 · (lr_base − lr_min) · (1 + cos(π · t / T))
pub struct CosineAnnealing {
    lr_base: f32,
    lr_min: f32,
    t_max: usize,
    current_step: usize,
}

impl CosineAnnealing {
    pub fn new(lr_base: f32, t_max: usize, lr_min: f32) -> Self {
        Self {
            lr_base,
            lr_min,
            t_max,
            current_step: 0,
        }
    }

    fn lr_at(&self, step: usize) -> f32 {
        if self.t_max == 0 || step >= self.t_max {
            return self.lr_min;
        }
        let progress = step as f32 / self.t_max as f32;
        let cosine_decay = 0.5 * (1.0 + (PI * progress).cos());
        self.lr_min + (self.lr_base - self.lr_min) * cosine_decay
    }

    fn step(&mut self, optimizer: &mut dyn Optimizer) {
        self.current_step += 1;
        optimizer.set_lr(self.lr_at(self.current_step));
    }
}
