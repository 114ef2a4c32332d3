//! Error types with actionable diagnostics.
//!
//! Every variant carries enough context to resolve the problem without
//! digging through source. Per-sample failures (a corrupt JPEG) are not
//! errors at all: they are recovered locally with a placeholder tensor so
//! one bad asset can never abort a training batch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for valorar operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing data, training, or serving.
#[derive(Error, Debug)]
pub enum Error {
    /// A vote histogram with no votes has no defined score.
    #[error("Invalid vote histogram for asset {asset_id}: all ten vote counts are zero\n  → Remove the row from the ground-truth CSV or fix its vote columns")]
    InvalidHistogram { asset_id: u64 },

    /// A score bin is too small to appear in every split.
    #[error("Score bin '{bin}' has only {size} example(s), too few to stratify\n  → Lower val_split/test_split or add more examples in that score range")]
    InsufficientBinSize { bin: String, size: usize },

    /// Unknown optimizer/scheduler/backbone tag.
    #[error("Unsupported {field}: '{value}'\n  → Supported values: {supported}")]
    UnsupportedConfig {
        field: &'static str,
        value: String,
        supported: &'static str,
    },

    /// Resume attempted against a checkpoint from a different model shape.
    #[error("Checkpoint is incompatible with the current model: {reason}\n  → Resume with the same backbone and output arity the checkpoint was trained with")]
    CheckpointIncompatible { reason: String },

    /// Durable-state write or read failed. Fatal during training: losing the
    /// checkpoint silently would defeat the resumability contract.
    #[error("Persistence failure while {context}\n  Cause: {source}")]
    Persistence {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("Invalid configuration in {path}:\n  {message}\n  → Check the JSON syntax and field names")]
    ConfigParsing { path: PathBuf, message: String },

    /// Ground-truth CSV could not be read or deserialized.
    #[error("Dataset error: {context}")]
    Dataset { context: String },

    /// Serialization/deserialization failure outside of config files.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl Error {
    /// Create a persistence error with context.
    pub fn persistence(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Persistence {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_actionable() {
        let err = Error::InsufficientBinSize {
            bin: "very_low".to_string(),
            size: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("very_low"));
        assert!(msg.contains("val_split"));
    }

    #[test]
    fn test_unsupported_config_lists_alternatives() {
        let err = Error::UnsupportedConfig {
            field: "optimizer",
            value: "rmsprop".to_string(),
            supported: "adam, sgd",
        };
        let msg = err.to_string();
        assert!(msg.contains("rmsprop"));
        assert!(msg.contains("adam"));
    }

    #[test]
    fn test_persistence_constructor_keeps_context() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::persistence("writing latest checkpoint", io_err);
        assert!(err.to_string().contains("latest checkpoint"));
    }

    #[test]
    fn test_invalid_histogram_names_asset() {
        let err = Error::InvalidHistogram { asset_id: 9417 };
        assert!(err.to_string().contains("9417"));
    }
}
