//! Valorar CLI
//!
//! # Usage
//!
//! ```bash
//! # Train with defaults
//! valorar train
//!
//! # Train from config with overrides
//! valorar train config.json --epochs 10 --lr 0.001
//!
//! # Resume an interrupted run
//! valorar train config.json --resume outputs/run_x/latest_checkpoint.json
//!
//! # Score an image
//! valorar evaluate photo.jpg --model outputs/run_x/best_model.json
//! ```

use clap::Parser;
use std::process::ExitCode;
use valorar::cli::{run_command, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
