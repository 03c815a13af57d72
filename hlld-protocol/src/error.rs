//! Protocol error types.

use std::num::ParseIntError;
use thiserror::Error;

/// Errors raised while decoding or classifying a server response.
///
/// Every variant carries either the raw server text or a description of the
/// structural defect so callers can diagnose unexpected replies.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("malformed block: {0}")]
    MalformedBlock(String),

    #[error("unexpected field count: expected {expected}, got {actual}")]
    UnexpectedFieldCount { expected: usize, actual: usize },

    #[error("invalid count field {value:?}: {source}")]
    InvalidCount {
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("response too large: {size} bytes buffered (max {max})")]
    ResponseTooLarge { size: usize, max: usize },

    #[error("truncated response: {0:?}")]
    Truncated(String),

    #[error("invalid UTF-8 in response")]
    InvalidUtf8,

    #[error("{size} unsolicited bytes buffered before request")]
    UnsolicitedData { size: usize },
}

impl ProtocolError {
    /// Returns the raw server text carried by this error, if any.
    pub fn raw(&self) -> Option<&str> {
        match self {
            ProtocolError::UnexpectedResponse(raw)
            | ProtocolError::MalformedBlock(raw)
            | ProtocolError::Truncated(raw) => Some(raw),
            ProtocolError::InvalidCount { value, .. } => Some(value),
            _ => None,
        }
    }
}
