//! Error types for threat engine

use thiserror::Error;

/// Threat engine error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transaction attributes could not be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rule configuration out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
