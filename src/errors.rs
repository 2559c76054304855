//! Error types for the gaze recorder
//!
//! Every failure is terminal for the action that triggered it. Callers
//! surface it as status text or an alert and carry on.

use thiserror::Error;

/// Main error type for recorder operations
#[derive(Error, Debug)]
pub enum RecorderError {
    /// Fallback tracker could not start (camera permission denied, etc.)
    #[error("Fallback tracker initialization failed: {0}")]
    FallbackInit(String),

    /// Export requested with empty logs
    #[error("No data to export")]
    NothingToExport,

    /// Socket or channel errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// External gaze source process could not be launched
    #[error("Could not open gaze source: {0}")]
    WindowOpen(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("Recorder error: {0}")]
    Generic(String),
}

/// Result type alias for recorder operations
pub type Result<T> = std::result::Result<T, RecorderError>;

/// Convert anyhow errors to RecorderError
impl From<anyhow::Error> for RecorderError {
    fn from(err: anyhow::Error) -> Self {
        RecorderError::Generic(err.to_string())
    }
}
