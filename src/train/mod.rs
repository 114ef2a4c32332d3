//! Training: configuration, loss, metrics, and the epoch orchestrator
//!
//! # Example
//!
//! ```no_run
//! use valorar::train::{TrainConfig, TrainingOrchestrator};
//!
//! let config = TrainConfig::default();
//! let mut orchestrator = TrainingOrchestrator::new(config)?;
//! orchestrator.setup_data()?;
//! orchestrator.setup_model()?;
//! let report = orchestrator.run()?;
//! println!("best val loss: {:?}", report.best_val_loss);
//! # Ok::<(), valorar::Error>(())
//! ```

mod config;
mod loss;
mod metrics;
mod orchestrator;
mod state;

pub use config::{OptimizerKind, SchedulerKind, TrainConfig};
pub use loss::{AestheticLoss, LossBreakdown};
pub use metrics::{mean_absolute_error, pearson_correlation};
pub use orchestrator::{Phase, TrainingOrchestrator, TrainingReport};
pub use state::TrainingState;
