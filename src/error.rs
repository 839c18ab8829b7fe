//! Error types for convograph operations.

use thiserror::Error;

/// Result type alias for convograph operations.
pub type Result<T> = std::result::Result<T, ConvoError>;

/// Main error type for convograph operations.
#[derive(Error, Debug)]
pub enum ConvoError {
    /// A uid was looked up or removed but is not present in the conversation
    #[error("Not found: {0}")]
    NotFound(String),

    /// Raw platform record could not be interpreted at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serialization/deserialization errors (shape mismatches, bincode)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors (unknown normalization mode, empty fit input)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConvoError {
    /// Creates a new not-found error.
    pub fn not_found<T: ToString>(msg: T) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// Creates a new parse error.
    pub fn parse<T: ToString>(msg: T) -> Self {
        Self::Parse(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }
}
