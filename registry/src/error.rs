//! Error types for loading and saving schema definitions.

use thiserror::Error;

/// Errors that can occur while reading or writing definition files.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// File extension is neither `.json`, `.yaml` nor `.yml`.
    #[error("unsupported definition format: {0}")]
    UnsupportedFormat(String),
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
