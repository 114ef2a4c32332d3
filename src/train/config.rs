//! Run configuration
//!
//! Loaded from a JSON file or built from defaults, with CLI overrides applied
//! on top. Backbone, optimizer, and scheduler identities stay as strings here
//! — exactly what the user typed — and resolve to closed enums once, at
//! setup time, where unknown tags fail fast.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Optimizer identity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerKind {
    Adam,
    Sgd,
}

impl FromStr for OptimizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adam" => Ok(OptimizerKind::Adam),
            "sgd" => Ok(OptimizerKind::Sgd),
            other => Err(Error::UnsupportedConfig {
                field: "optimizer",
                value: other.to_string(),
                supported: "adam, sgd",
            }),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptimizerKind::Adam => "adam",
            OptimizerKind::Sgd => "sgd",
        })
    }
}

/// Scheduler identity tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerKind {
    ReduceOnPlateau,
    Cosine,
    None,
}

impl FromStr for SchedulerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reduce_on_plateau" => Ok(SchedulerKind::ReduceOnPlateau),
            "cosine" => Ok(SchedulerKind::Cosine),
            "none" => Ok(SchedulerKind::None),
            other => Err(Error::UnsupportedConfig {
                field: "scheduler",
                value: other.to_string(),
                supported: "reduce_on_plateau, cosine, none",
            }),
        }
    }
}

/// Full training run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub csv_path: PathBuf,
    pub images_path: PathBuf,
    pub output_dir: PathBuf,

    pub backbone: String,
    pub pretrained: bool,

    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub optimizer: String,
    pub weight_decay: f32,
    /// Global gradient-norm clip threshold; 0 disables clipping.
    pub gradient_clip: f32,
    pub scheduler: String,

    pub val_split: f32,
    pub test_split: f32,
    pub num_workers: usize,
    pub random_seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("datasets/ground_truth_dataset.csv"),
            images_path: PathBuf::from("datasets/images"),
            output_dir: PathBuf::from("outputs"),
            backbone: "resnet50".to_string(),
            pretrained: true,
            epochs: 20,
            batch_size: 16,
            learning_rate: 1e-4,
            optimizer: "adam".to_string(),
            weight_decay: 1e-4,
            gradient_clip: 1.0,
            scheduler: "reduce_on_plateau".to_string(),
            val_split: 0.15,
            test_split: 0.15,
            num_workers: 0,
            random_seed: 42,
        }
    }
}

impl TrainConfig {
    /// Load a configuration from a JSON file. Missing fields fall back to
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::ConfigParsing {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| Error::ConfigParsing {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Resolve the optimizer tag; unknown names fail fast.
    pub fn optimizer_kind(&self) -> Result<OptimizerKind> {
        self.optimizer.parse()
    }

    /// Resolve the scheduler tag; unknown names fail fast.
    pub fn scheduler_kind(&self) -> Result<SchedulerKind> {
        self.scheduler.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_mirror_reference_run() {
        let config = TrainConfig::default();
        assert_eq!(config.backbone, "resnet50");
        assert_eq!(config.epochs, 20);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.optimizer, "adam");
        assert_eq!(config.scheduler, "reduce_on_plateau");
        assert_eq!(config.random_seed, 42);
        assert!((config.val_split - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"epochs": 3, "optimizer": "sgd"}}"#).unwrap();

        let config = TrainConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.epochs, 3);
        assert_eq!(config.optimizer, "sgd");
        assert_eq!(config.batch_size, 16); // default
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let err = TrainConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigParsing { .. }));
    }

    #[test]
    fn test_unknown_optimizer_fails_fast() {
        let config = TrainConfig {
            optimizer: "rmsprop".to_string(),
            ..TrainConfig::default()
        };
        let err = config.optimizer_kind().unwrap_err();
        assert!(matches!(err, Error::UnsupportedConfig { field: "optimizer", .. }));
    }

    #[test]
    fn test_known_tags_resolve() {
        let config = TrainConfig::default();
        assert_eq!(config.optimizer_kind().unwrap(), OptimizerKind::Adam);
        assert_eq!(
            config.scheduler_kind().unwrap(),
            SchedulerKind::ReduceOnPlateau
        );
    }

    #[test]
    fn test_scheduler_none_is_valid() {
        let config = TrainConfig {
            scheduler: "none".to_string(),
            ..TrainConfig::default()
        };
        assert_eq!(config.scheduler_kind().unwrap(), SchedulerKind::None);
    }
}
