//! Error types for npulet

use thiserror::Error;

/// Main error type for npulet
#[derive(Error, Debug)]
pub enum NpuletError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Topology classification error
    #[error("Topology error: {0}")]
    Topology(String),

    /// Device error
    #[error("Device error: {0}")]
    Device(String),

    /// Snapshot error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for npulet operations
pub type NpuletResult<T> = Result<T, NpuletError>;

impl From<serde_json::Error> for NpuletError {
    fn from(err: serde_json::Error) -> Self {
        NpuletError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for NpuletError {
    fn from(err: toml::de::Error) -> Self {
        NpuletError::Config(err.to_string())
    }
}
