//! Conversion error types

use thiserror::Error;

/// Result type for conversions
pub type ConversionResult<T> = Result<T, ConversionError>;

/// A raw document could not be mapped to (or from) the declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Deserialization into the target type failed
    #[error("Cannot read {target}: {message}")]
    Deserialize { target: String, message: String },

    /// A value that must be a document was something else
    #[error("Not a document: {0}")]
    NotADocument(String),

    /// The document carries no identifier
    #[error("Document has no identifier")]
    MissingId,
}

impl ConversionError {
    /// Create a deserialization error for the given target type
    pub fn deserialize(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Deserialize {
            target: target.into(),
            message: err.to_string(),
        }
    }
}
