//! Command execution.

use crate::Commands;
use colored::Colorize;
use hlld_client::{Client, ClientError};
use hlld_protocol::{ProtocolError, SetAttributes};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Executes a command and returns the formatted output.
pub async fn execute<S>(client: &mut Client<S>, cmd: Commands) -> Result<String, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match cmd {
        Commands::Repl => unreachable!(),

        Commands::Create {
            key,
            precision,
            eps,
            in_memory,
            retries,
            retry_delay_ms,
        } => {
            let attrs = build_attributes(precision, eps, in_memory);
            let attempts = create_with_retry(
                client,
                &key,
                attrs.as_ref(),
                retries,
                Duration::from_millis(retry_delay_ms),
            )
            .await?;

            if attempts > 1 {
                Ok(format!(
                    "{} set {} (after {} attempts)",
                    "Created".green(),
                    key.cyan(),
                    attempts
                ))
            } else {
                Ok(format!("{} set {}", "Created".green(), key.cyan()))
            }
        }

        Commands::Drop { key } => {
            client.drop(&key).await?;
            Ok(format!("{} set {}", "Dropped".green(), key.cyan()))
        }

        Commands::Set { key, value } => {
            client.set(&key, &value).await?;
            Ok("Done".green().to_string())
        }

        Commands::Bulk { key, values } => {
            client.bulk(&key, &values).await?;
            Ok(format!("{} ({} values)", "Done".green(), values.len()))
        }

        Commands::List { key } => {
            let count = client.list(&key).await?;
            Ok(format!("{} {}", key.cyan(), count.to_string().yellow()))
        }
    }
}

/// Builds creation attributes from optional flags.
///
/// Returns `None` when no flag would reach the wire, so the plain
/// `create <key>` form is sent.
pub fn build_attributes(
    precision: Option<i32>,
    eps: Option<f64>,
    in_memory: bool,
) -> Option<SetAttributes> {
    let attrs = SetAttributes::new()
        .with_precision(precision.unwrap_or_default())
        .with_error_bound(eps.unwrap_or_default())
        .with_in_memory(in_memory);
    if attrs.is_empty() {
        None
    } else {
        Some(attrs)
    }
}

/// Renders an error for the terminal, adding the server's text when a reply
/// could not be classified.
pub fn format_error(err: &ClientError) -> String {
    let mut out = format!("{}: {}", "Error".red(), err);
    if let ClientError::Protocol(protocol) = err {
        if let Some(raw) = protocol.raw().filter(|_| !is_unexpected(protocol)) {
            out.push_str(&format!("\n  {} {:?}", "server sent".dimmed(), raw));
        }
    }
    out
}

// Unexpected replies already print their text in the message.
fn is_unexpected(err: &ProtocolError) -> bool {
    matches!(err, ProtocolError::UnexpectedResponse(_))
}

/// Creates a set, retrying up to `retries` times while a previous set with
/// the same name is still being deleted.
///
/// Returns the number of attempts made.
pub async fn create_with_retry<S>(
    client: &mut Client<S>,
    key: &str,
    attrs: Option<&SetAttributes>,
    retries: u32,
    delay: Duration,
) -> Result<u32, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        match client.create(key, attrs).await {
            Ok(()) => return Ok(attempts),
            Err(err) if err.is_retryable() && attempts <= retries => {
                tracing::debug!("{} is being deleted, retry {} of {}", key, attempts, retries);
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
