//! Durable-state persistence
//!
//! Everything a run writes — checkpoints, split summaries, model info, the
//! final history — is pretty-printed JSON. Checkpoint writes are fatal on
//! failure: silently losing recoverability would defeat the resumability
//! contract.

mod checkpoint;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

pub use checkpoint::{
    load_checkpoint, save_checkpoint, Checkpoint, LearnerSnapshot, ParameterRecord,
    BEST_CHECKPOINT, LATEST_CHECKPOINT,
};

/// Serialize a value as pretty JSON to a file.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T, context: &str) -> Result<()> {
    let data = serde_json::to_string_pretty(value).map_err(|e| Error::Serialization {
        message: format!("{context}: {e}"),
    })?;
    let mut file =
        File::create(path.as_ref()).map_err(|e| Error::persistence(context.to_string(), e))?;
    file.write_all(data.as_bytes())
        .map_err(|e| Error::persistence(context.to_string(), e))?;
    Ok(())
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>, context: &str) -> Result<T> {
    let content = std::fs::read_to_string(path.as_ref())
        .map_err(|e| Error::persistence(context.to_string(), e))?;
    serde_json::from_str(&content).map_err(|e| Error::Serialization {
        message: format!("{context}: {e}"),
    })
}
