// this_file: src/error.rs
//! Error types for the imgbridge library

use crate::status;
use thiserror::Error;

/// Main error type for imgbridge operations
#[derive(Debug, Error)]
pub enum Error {
    /// An engine could not be initialized or is not compiled in
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Non-success status reported by the font engine
    #[error("{message}")]
    FaceEngine {
        /// Engine status code
        code: u16,
        /// Message resolved through the status table
        message: &'static str,
    },

    /// Complex shaping session failure
    #[error("Shaping error: {0}")]
    Shaping(String),

    /// The codec reported an error event or rejected a call
    #[error("Codec error: {0}")]
    Codec(String),

    /// The codec emitted an event that is not legal in the current state
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An internal allocation could not be satisfied
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Direction, language or features requested without complex shaping
    #[error(
        "setting text direction, language or font features is not supported without complex shaping"
    )]
    UnsupportedLayoutOption,

    /// Malformed anchor code
    #[error("bad anchor specified: {0}")]
    BadAnchor(String),

    /// Unknown writing direction
    #[error("direction must be either 'rtl', 'ltr' or 'ttb', got '{0}'")]
    InvalidDirection(String),

    /// Box type tags are exactly four bytes
    #[error("box type must be 4 bytes, got {0}")]
    InvalidBoxType(usize),

    /// Invalid input parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Byte source read/seek failure
    #[error("Source I/O error: {0}")]
    SourceIo(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Build a font engine error from a status code.
    pub fn face(code: u16) -> Self {
        Error::FaceEngine {
            code,
            message: status::describe(code),
        }
    }

    /// True for the usage errors callers can fix by changing arguments.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedLayoutOption
                | Error::BadAnchor(_)
                | Error::InvalidDirection(_)
                | Error::InvalidBoxType(_)
                | Error::InvalidParameter(_)
        )
    }
}

/// Result type alias for imgbridge operations
pub type Result<T> = std::result::Result<T, Error>;
