//! Query error types
//!
//! Error kinds:
//! - REPO_CONFIGURATION: bad method metadata, raised at registration time
//! - REPO_DATA_ACCESS: store or transport failure
//! - REPO_CONVERSION: a document could not be mapped to the returned type

use std::fmt;

use thiserror::Error;

use crate::convert::ConversionError;
use crate::store::StoreError;

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Broad error category, so callers can tell store problems from mapping problems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DataAccess,
    Conversion,
}

impl ErrorKind {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "REPO_CONFIGURATION",
            ErrorKind::DataAccess => "REPO_DATA_ACCESS",
            ErrorKind::Conversion => "REPO_CONVERSION",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Error raised while registering or executing a repository query
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Method metadata is invalid
    #[error("Invalid query configuration: {0}")]
    Configuration(String),

    /// The store failed the operation
    #[error("Data access failed: {0}")]
    DataAccess(#[from] StoreError),

    /// A result could not be converted
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

impl QueryError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::DataAccess(_) => ErrorKind::DataAccess,
            Self::Conversion(_) => ErrorKind::Conversion,
        }
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_data_access(&self) -> bool {
        self.kind() == ErrorKind::DataAccess
    }

    pub fn is_conversion(&self) -> bool {
        self.kind() == ErrorKind::Conversion
    }
}
