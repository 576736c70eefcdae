//! Error types for the ablation workspace.
//!
//! Every library crate reports failures through [`QsarError`]; the binary
//! wraps them in `anyhow` at the top level.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for configuration, model, data and evaluation failures.
#[derive(Error, Debug)]
pub enum QsarError {
    /// Settings file missing, unreadable, or not in `[SECTION] key = value` form
    #[error("Could not read config file {path}: {message}")]
    ConfigRead { path: PathBuf, message: String },

    /// Required key absent from a config section
    #[error("Must specify {key} in {section} in config")]
    ConfigKey { section: String, key: String },

    /// Key present but not convertible to the expected type
    #[error("Invalid value '{value}' for {section}.{key}: expected {expected}")]
    ConfigValue {
        section: String,
        key: String,
        value: String,
        expected: String,
    },

    /// Existing weights requested but the file does not exist
    #[error("Weights not found at specified path {}", .0.display())]
    WeightsNotFound(PathBuf),

    /// `use_existing_weights` is false; evaluation cannot proceed untrained
    #[error("Could not load weights: use_existing_weights is false and this tool never trains")]
    WeightsLoadRefused,

    /// Weights payload could not be decoded
    #[error("Weights format error: {0}")]
    WeightsFormat(String),

    /// Tensor or parameter dimensions disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Model construction interrupted by the user
    #[error("User cancelled model building")]
    UserCancelled,

    /// Malformed or inconsistent dataset
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Evaluator failure (metrics or result persistence)
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// I/O errors (config, weights, dataset, result files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QsarError {
    /// Creates a config read error.
    pub fn config_read(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        QsarError::ConfigRead {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a missing-key error.
    pub fn config_key(section: impl Into<String>, key: impl Into<String>) -> Self {
        QsarError::ConfigKey {
            section: section.into(),
            key: key.into(),
        }
    }

    /// Creates a value conversion error.
    pub fn config_value(
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        QsarError::ConfigValue {
            section: section.into(),
            key: key.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Creates a shape mismatch error.
    pub fn shape(message: impl Into<String>) -> Self {
        QsarError::ShapeMismatch(message.into())
    }

    /// Creates a dataset error.
    pub fn dataset(message: impl Into<String>) -> Self {
        QsarError::Dataset(message.into())
    }

    /// Creates an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        QsarError::Evaluation(message.into())
    }

    /// Creates a weights format error.
    pub fn weights_format(message: impl Into<String>) -> Self {
        QsarError::WeightsFormat(message.into())
    }

    /// Checks whether the error stems from the settings file.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            QsarError::ConfigRead { .. } | QsarError::ConfigKey { .. } | QsarError::ConfigValue { .. }
        )
    }

    /// Returns a user-friendly error message with actionable guidance.
    pub fn user_message(&self) -> String {
        match self {
            QsarError::ConfigKey { section, key } => {
                format!(
                    "{}\n\
                     → Add `{} = ...` under the [{}] section of the settings file.",
                    self, key, section
                )
            }
            QsarError::ConfigValue { expected, .. } => {
                format!(
                    "{}\n\
                     → Booleans accept true/false, yes/no, 1/0; numbers must not carry units.\n\
                     → Expected type: {}.",
                    self, expected
                )
            }
            QsarError::WeightsNotFound(path) => {
                format!(
                    "{}\n\
                     → Set IO.weights_fpath, or place the weights at {}.",
                    self,
                    path.display()
                )
            }
            QsarError::WeightsLoadRefused => {
                format!(
                    "{}\n\
                     → Set IO.use_existing_weights = true and point IO.weights_fpath at trained weights.",
                    self
                )
            }
            QsarError::WeightsFormat(_) => {
                format!(
                    "{}\n\
                     → Export the trained weights as JSON dense layers (see qsar-gnn::weights).",
                    self
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type alias for ablation operations.
pub type Result<T> = std::result::Result<T, QsarError>;
