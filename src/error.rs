//! Unified error hierarchy for posturers
//!
//! Sensor-quality problems (hidden landmarks, noisy calibration) are never
//! errors: they are absorbed into output fields. The types here cover the
//! remaining hard failures, which are host-side configuration mistakes
//! surfaced before any frame is processed.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all posturers operations
#[derive(Debug, Error)]
pub enum PostureError {
    /// Analysis configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Exercise definition and catalog errors
    #[error("Exercise error: {0}")]
    Exercise(#[from] ExerciseError),

    /// Malformed landmark frames
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be found
    #[error("Config file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A parameter is outside its valid range
    #[error("Invalid value for {parameter}: {value} ({reason})")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
}

/// Exercise definition errors
#[derive(Debug, Error)]
pub enum ExerciseError {
    /// No exercise registered under this id
    #[error("Unknown exercise: {id}")]
    UnknownExercise { id: String },

    /// A sequence exercise with no poses
    #[error("Exercise {id} has an empty pose list")]
    EmptyPoseList { id: String },

    /// Sets, hold time or cycles out of range
    #[error("Invalid parameter for exercise {id}: {parameter}={value}")]
    InvalidParameter {
        id: String,
        parameter: String,
        value: String,
    },

    /// Two exercises registered under one id
    #[error("Duplicate exercise id: {id}")]
    DuplicateId { id: String },
}

/// Landmark frame errors
#[derive(Debug, Error)]
pub enum FrameError {
    /// Frame does not carry the full 33-point topology
    #[error("Expected {expected} landmarks, got {actual}")]
    WrongLandmarkCount { expected: usize, actual: usize },
}

/// Result type alias for posturers operations
pub type Result<T> = std::result::Result<T, PostureError>;

impl ConfigError {
    pub(crate) fn invalid(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl PostureError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PostureError::Frame(_) => ErrorSeverity::Warning,
            PostureError::Config(ConfigError::FileNotFound { .. }) => ErrorSeverity::Warning,
            PostureError::Exercise(ExerciseError::UnknownExercise { .. }) => ErrorSeverity::Error,
            PostureError::Config(_) | PostureError::Exercise(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PostureError::Config(ConfigError::FileNotFound { path }) => {
                format!("Could not find configuration file: {}", path.display())
            }
            PostureError::Exercise(ExerciseError::UnknownExercise { id }) => {
                format!("No exercise named '{}'. Use `posturers exercises` to list them.", id)
            }
            PostureError::Exercise(ExerciseError::EmptyPoseList { id }) => {
                format!("Exercise '{}' has no poses to perform.", id)
            }
            PostureError::Frame(FrameError::WrongLandmarkCount { actual, .. }) => {
                format!(
                    "Recorded frame has {} landmarks; a full-body recording is required.",
                    actual
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Programming or configuration mistake; the operation cannot proceed
    Critical,
    /// Error that prevents the operation but the host can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
