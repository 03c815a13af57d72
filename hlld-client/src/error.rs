//! Client error types.

use hlld_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,

    #[error("key exists")]
    KeyExists,

    #[error("key delete in progress")]
    KeyDeleteInProgress,
}

impl ClientError {
    /// Returns whether this error came from the socket rather than the server.
    ///
    /// A connection that failed this way is closed; reconnect to continue.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_)
                | ClientError::NotConnected
                | ClientError::ConnectionClosed
                | ClientError::Timeout
        )
    }

    /// Returns whether repeating the same command later may succeed on the
    /// same connection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::KeyDeleteInProgress)
    }
}
