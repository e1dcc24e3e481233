//! Error types for the fixture runner
//!
//! All fallible operations return `Result<T, Error>`.
//! Suite-level errors (`FixtureFormat`, `Io`, `Config`) abort a run;
//! every other variant is caught per test case and turned into a FAIL.

use thiserror::Error;

/// Fixture runner error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Malformed fixture document
    #[error("Fixture format error: {0}")]
    FixtureFormat(String),

    /// Literal carries a `type:` tag the codec does not know
    #[error("Unsupported literal type '{tag}' in token '{token}'")]
    UnsupportedLiteralType { tag: String, token: String },

    /// Literal value could not be decoded for its declared type
    #[error("Cannot decode literal #{position} '{token}': {reason}")]
    LiteralDecode {
        token: String,
        position: usize,
        reason: String,
    },

    /// Target method is not registered in the dispatch table
    #[error("Method '{method}' is not registered")]
    DispatchNotFound { method: String },

    /// Decoded arguments do not fit the method descriptor
    #[error("Argument mismatch for '{method}': {reason}")]
    ArgumentMismatch { method: String, reason: String },

    /// The called method raised a failure of its own
    #[error("Contract assertion failed: {0}")]
    InternalAssertionFailure(String),

    /// Decoded return value differs from the expected literal
    #[error("Expected {expected}, got {actual}")]
    ExpectationMismatch { expected: String, actual: String },

    /// Call targeted a contract that has destroyed itself
    #[error("Contract {0} has been destroyed")]
    ContractDestroyed(String),

    /// Invalid runner configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem failure while loading fixtures or config
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Result type alias for fixture runner operations
pub type Result<T> = std::result::Result<T, Error>;
