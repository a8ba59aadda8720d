//! Error types for Twiniverse
//!
//! Provides a unified error type for all protocol operations.

use thiserror::Error;

/// Result type alias using TwinError
pub type Result<T> = std::result::Result<T, TwinError>;

/// Unified error type for Twiniverse operations
#[derive(Debug, Error)]
pub enum TwinError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    /// Socket could not be opened, or was dropped/reset mid-exchange
    #[error("Connection error: {0}")]
    Connection(String),

    /// Stream ended before a declared length was satisfied
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// A length field or command tag is outside its accepted range
    #[error("Framing violation: {0}")]
    FramingViolation(String),

    /// Zero-length body where an empty payload is never a success
    #[error("Server returned empty data")]
    EmptyResponse,

    /// Application-level `ERROR_*` sentinel returned in place of data
    #[error("Server error: {0}")]
    ServerError(String),

    /// LOGIN body is not a JSON array of exactly two booleans
    #[error("Decode error: {0}")]
    Decode(String),

    // -------------------------------------------------------------------------
    // Local Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local file I/O (reading media, saving artifacts)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TwinError {
    /// True when the exchange could not be completed over the wire.
    ///
    /// A short read is a transport failure, not end-of-data.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, TwinError::Connection(_) | TwinError::ShortRead { .. })
    }

    /// Short message suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            TwinError::Connection(_) | TwinError::ShortRead { .. } => {
                "Could not reach the server. Check your network connection."
            }
            TwinError::FramingViolation(_) | TwinError::Decode(_) => {
                "The server sent a response that could not be understood."
            }
            TwinError::EmptyResponse => "The server did not return a model.",
            TwinError::ServerError(_) => "The server reported an error for this request.",
            TwinError::Config(_) => "The client is misconfigured.",
            TwinError::Io(_) => "A local file could not be read or written.",
        }
    }

    /// Classify a mid-exchange socket error
    pub(crate) fn from_transport(context: &str, err: std::io::Error) -> Self {
        TwinError::Connection(format!("{}: {}", context, err))
    }
}
