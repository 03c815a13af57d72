//! Connection management.

use crate::error::ClientError;
use hlld_protocol::{
    ProtocolError, Response, ResponseDecoder, DEFAULT_PORT, MAX_RESPONSE_SIZE,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (64 bytes).
pub const MIN_READ_BUFFER_SIZE: usize = 64;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for one request/response exchange.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address as `host:port`.
    pub addr: String,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Deadline covering the write and the full read of one command.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Largest reply the decoder will buffer.
    pub max_response_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_response_size: MAX_RESPONSE_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_max_response_size(mut self, size: usize) -> Self {
        self.max_response_size = size;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(format!("127.0.0.1:{}", DEFAULT_PORT))
    }
}

/// A connection to an hlld server.
///
/// Owns exactly one stream. Any error from [`Connection::request`] drops the
/// stream, since a failed exchange may leave part of a reply on the wire; the
/// connection then reports [`ClientError::NotConnected`] until replaced.
pub struct Connection<S = TcpStream> {
    stream: Option<S>,
    decoder: ResponseDecoder,
    read_buf: Vec<u8>,
    request_timeout: Duration,
}

impl Connection<TcpStream> {
    /// Opens a TCP connection to `config.addr`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ClientError> {
        tracing::debug!("Connecting to {}...", config.addr);

        let stream = tokio::time::timeout(
            config.connect_timeout,
            TcpStream::connect(config.addr.as_str()),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        stream.set_nodelay(true).ok();
        tracing::debug!("TCP connected to {}", config.addr);

        Ok(Self::from_stream(stream, config))
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps an already established stream.
    pub fn from_stream(stream: S, config: &ConnectionConfig) -> Self {
        let read_buffer_size = config
            .read_buffer_size
            .clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        Self {
            stream: Some(stream),
            decoder: ResponseDecoder::with_max_size(config.max_response_size),
            read_buf: vec![0u8; read_buffer_size],
            request_timeout: config.request_timeout,
        }
    }

    /// Returns whether the connection still owns a stream.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Sends one command line and waits for its reply.
    ///
    /// The write and the whole read share one deadline; expiry yields
    /// [`ClientError::Timeout`].
    pub async fn request(&mut self, line: &[u8]) -> Result<Response, ClientError> {
        let result = match tokio::time::timeout(self.request_timeout, self.exchange(line)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        };

        if result.is_err() {
            self.stream = None;
            self.decoder.clear();
        }
        result
    }

    async fn exchange(&mut self, line: &[u8]) -> Result<Response, ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        // Leftovers would be taken as the reply to this command.
        let leftover = self.decoder.buffered();
        if leftover > 0 {
            return Err(ProtocolError::UnsolicitedData { size: leftover }.into());
        }

        stream.write_all(line).await?;
        stream.flush().await?;
        tracing::trace!("Sent {} bytes", line.len());

        loop {
            let n = stream.read(&mut self.read_buf).await?;
            tracing::trace!("Read {} bytes from socket", n);

            if n == 0 {
                return match self.decoder.finish()? {
                    Some(response) => Ok(response),
                    None => Err(ClientError::ConnectionClosed),
                };
            }

            self.decoder.extend(&self.read_buf[..n]);
            if let Some(response) = self.decoder.decode()? {
                tracing::trace!("Decoded response, {} bytes left over", self.decoder.buffered());
                return Ok(response);
            }
        }
    }

    /// Closes the connection. Calling it again is a no-op.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!("Closing connection");
            let _ = stream.shutdown().await;
        }
        self.decoder.clear();
        Ok(())
    }
}
