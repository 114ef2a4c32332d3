//! Command-line interface
//!
//! `valorar train` drives a full training run from a JSON config (or
//! defaults) with flag overrides; `valorar evaluate` scores one image
//! against a trained checkpoint and prints the result JSON to stdout.

use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::error::Result;
use crate::infer::{EvaluationReport, Evaluator};
use crate::train::{TrainConfig, TrainingOrchestrator};

/// Photography aesthetic scoring: training and inference.
#[derive(Parser)]
#[command(name = "valorar", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Train the aesthetic regression model.
    Train {
        /// Path to a JSON configuration file; defaults apply when omitted.
        config: Option<PathBuf>,

        #[arg(long)]
        epochs: Option<usize>,

        #[arg(long)]
        batch_size: Option<usize>,

        /// Learning rate override.
        #[arg(long)]
        lr: Option<f32>,

        #[arg(long)]
        backbone: Option<String>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Resume from a checkpoint file instead of starting fresh.
        #[arg(long)]
        resume: Option<PathBuf>,
    },

    /// Score one image with a trained checkpoint.
    Evaluate {
        /// Image file to score.
        image: PathBuf,

        /// Checkpoint to load (typically best_model.json).
        #[arg(long)]
        model: PathBuf,
    },
}

/// Execute a parsed command.
pub fn run_command(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train {
            config,
            epochs,
            batch_size,
            lr,
            backbone,
            output_dir,
            resume,
        } => {
            let mut train_config = match config {
                Some(path) => TrainConfig::from_json_file(path)?,
                None => TrainConfig::default(),
            };

            if let Some(epochs) = epochs {
                train_config.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                train_config.batch_size = batch_size;
            }
            if let Some(lr) = lr {
                train_config.learning_rate = lr;
            }
            if let Some(backbone) = backbone {
                train_config.backbone = backbone;
            }
            if let Some(output_dir) = output_dir {
                train_config.output_dir = output_dir;
            }

            // Fresh runs get a timestamped subdirectory; resumed runs write
            // back into the directory the checkpoint came from.
            if resume.is_none() {
                let stamp = Local::now().format("%Y%m%d_%H%M%S");
                train_config.output_dir = train_config.output_dir.join(format!("run_{stamp}"));
            }

            println!("Training Configuration:");
            println!("  backbone: {}", train_config.backbone);
            println!("  epochs: {}", train_config.epochs);
            println!("  batch_size: {}", train_config.batch_size);
            println!("  learning_rate: {}", train_config.learning_rate);
            println!("  optimizer: {}", train_config.optimizer);
            println!("  scheduler: {}", train_config.scheduler);
            println!("  output_dir: {}", train_config.output_dir.display());

            let mut orchestrator = TrainingOrchestrator::new(train_config)?;
            orchestrator.setup_data()?;
            orchestrator.setup_model()?;
            if let Some(checkpoint) = resume {
                orchestrator.resume(checkpoint)?;
            }
            orchestrator.run()?;

            println!("\nTraining completed successfully!");
            println!("Results saved to: {}", orchestrator.output_dir().display());
            Ok(())
        }

        Command::Evaluate { image, model } => {
            // The serving boundary never throws: construction or evaluation
            // failures become an error field in the printed JSON.
            let report = match Evaluator::from_checkpoint(&model) {
                Ok(evaluator) => evaluator.evaluate_path(&image),
                Err(e) => EvaluationReport::failed(format!("Failed to load model: {e}")),
            };
            let json = serde_json::to_string(&report).map_err(|e| {
                crate::error::Error::Serialization {
                    message: format!("serializing evaluation report: {e}"),
                }
            })?;
            println!("{json}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_flags() {
        let cli = Cli::parse_from([
            "valorar", "train", "--epochs", "3", "--lr", "0.001", "--backbone", "mobilenet_v3",
        ]);
        match cli.command {
            Command::Train {
                epochs,
                lr,
                backbone,
                ..
            } => {
                assert_eq!(epochs, Some(3));
                assert_eq!(lr, Some(0.001));
                assert_eq!(backbone.as_deref(), Some("mobilenet_v3"));
            }
            Command::Evaluate { .. } => panic!("expected train"),
        }
    }

    #[test]
    fn test_evaluate_args() {
        let cli = Cli::parse_from([
            "valorar",
            "evaluate",
            "photo.jpg",
            "--model",
            "best_model.json",
        ]);
        match cli.command {
            Command::Evaluate { image, model } => {
                assert_eq!(image, PathBuf::from("photo.jpg"));
                assert_eq!(model, PathBuf::from("best_model.json"));
            }
            Command::Train { .. } => panic!("expected evaluate"),
        }
    }
}
