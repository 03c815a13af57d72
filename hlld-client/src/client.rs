//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use hlld_protocol::{Command, ProtocolError, Response, SetAttributes};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// High-level client for hlld.
///
/// Each operation sends one command and classifies its reply. Only a literal
/// `Done` counts as success; `create` additionally maps `Exists` and
/// `Delete in progress` to their own errors. Every other reply is returned as
/// [`ProtocolError::UnexpectedResponse`] carrying the server text.
pub struct Client<S = TcpStream> {
    conn: Connection<S>,
}

impl Client<TcpStream> {
    /// Connects to the server at `config.addr`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ClientError> {
        Ok(Self {
            conn: Connection::connect(config).await?,
        })
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client over an existing stream.
    pub fn from_stream(stream: S, config: &ConnectionConfig) -> Self {
        Self {
            conn: Connection::from_stream(stream, config),
        }
    }

    /// Returns whether the client still holds its connection.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    async fn execute(&mut self, command: Command<'_>) -> Result<Response, ClientError> {
        tracing::debug!(verb = %command.verb(), key = command.key(), "sending command");
        let response = self.conn.request(&command.encode()).await?;
        tracing::debug!(verb = %command.verb(), done = response.is_done(), "received response");
        Ok(response)
    }

    /// Creates a counting set.
    ///
    /// Returns [`ClientError::KeyDeleteInProgress`] while a set with the same
    /// name is still being dropped; waiting and retrying is up to the caller.
    pub async fn create(
        &mut self,
        key: &str,
        attributes: Option<&SetAttributes>,
    ) -> Result<(), ClientError> {
        match self.execute(Command::Create { key, attributes }).await? {
            Response::Done => Ok(()),
            Response::Exists => Err(ClientError::KeyExists),
            Response::DeleteInProgress => Err(ClientError::KeyDeleteInProgress),
            other => Err(ProtocolError::UnexpectedResponse(other.to_string()).into()),
        }
    }

    /// Drops a counting set.
    pub async fn drop(&mut self, key: &str) -> Result<(), ClientError> {
        let response = self.execute(Command::Drop { key }).await?;
        Ok(response.expect_done()?)
    }

    /// Adds one value to a set.
    pub async fn set(&mut self, key: &str, value: &str) -> Result<(), ClientError> {
        let response = self.execute(Command::Set { key, value }).await?;
        Ok(response.expect_done()?)
    }

    /// Adds several values to a set in one command.
    pub async fn bulk<V: AsRef<str>>(&mut self, key: &str, values: &[V]) -> Result<(), ClientError> {
        let values = values.iter().map(AsRef::as_ref).collect();
        let response = self.execute(Command::Bulk { key, values }).await?;
        Ok(response.expect_done()?)
    }

    /// Returns the estimated cardinality of a set.
    pub async fn list(&mut self, key: &str) -> Result<i64, ClientError> {
        let response = self.execute(Command::List { key }).await?;
        Ok(response.list_count()?)
    }
}
