//! Store error types
//!
//! Everything the store driver can report. All of these surface to
//! callers as data-access errors.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a document store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The connection to the store failed or was interrupted
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The store rejected the command
    #[error("Command failed ({code}): {message}")]
    CommandFailed { code: i32, message: String },

    /// The filter expression could not be interpreted
    #[error("Malformed criteria: {0}")]
    MalformedCriteria(String),

    /// The cursor was used after it was released
    #[error("Cursor already closed")]
    CursorClosed,

    /// A document came back without an `_id`
    #[error("Document without _id in collection {0}")]
    MissingId(String),
}

impl StoreError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a command failure
    pub fn command_failed(code: i32, msg: impl Into<String>) -> Self {
        Self::CommandFailed {
            code,
            message: msg.into(),
        }
    }

    /// Create a malformed criteria error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedCriteria(msg.into())
    }

    /// Create a missing-id error for `collection`
    pub fn missing_id(collection: impl Into<String>) -> Self {
        Self::MissingId(collection.into())
    }

    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "REPO_STORE_TRANSPORT",
            Self::CommandFailed { .. } => "REPO_STORE_COMMAND_FAILED",
            Self::MalformedCriteria(_) => "REPO_STORE_MALFORMED_CRITERIA",
            Self::CursorClosed => "REPO_STORE_CURSOR_CLOSED",
            Self::MissingId(_) => "REPO_STORE_MISSING_ID",
        }
    }
}
