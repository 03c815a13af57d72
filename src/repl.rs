//! Interactive REPL.

use crate::commands::{create_with_retry, format_error};
use colored::Colorize;
use hlld_client::{Client, ClientError};
use hlld_protocol::SetAttributes;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

const HELP_TEXT: &str = r#"
Available commands:
  help                              Show this help

  create <key> [precision=N] [eps=F] [in_memory]
                                    Create a set
  drop <key>                        Drop a set
  set <key> <value>                 Add a value
  bulk <key> <value>...             Add several values
  list <key>                        Show estimated cardinality

  quit, exit                        Exit the REPL
"#;

/// Number of extra `create` attempts while a set is still being deleted.
const CREATE_RETRIES: u32 = 3;

/// Delay between `create` attempts.
const CREATE_RETRY_DELAY: Duration = Duration::from_secs(1);

pub async fn run<S>(mut client: Client<S>, addr: &str) -> Result<(), Box<dyn std::error::Error>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    println!("{}", "hlld CLI".bold().cyan());
    println!("{} {}", "Connected to".green(), addr);

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".hlld_history"))
        .unwrap_or_else(|_| ".hlld_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "hlld>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut client, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => {
                        println!("{}\n", format_error(&e));
                        if e.is_transport() {
                            println!("{}", "Connection lost.".red());
                            break;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command<S>(
    client: &mut Client<S>,
    line: &str,
) -> Result<Option<String>, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.is_empty() {
        return Ok(Some(String::new()));
    }

    let cmd = parts[0].to_lowercase();
    let args = &parts[1..];

    match cmd.as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "create" | "c" => {
            let Some((key, options)) = args.split_first() else {
                return Ok(Some(
                    "Usage: create <key> [precision=N] [eps=F] [in_memory]".to_string(),
                ));
            };
            let attrs = match parse_create_options(options) {
                Ok(attrs) => attrs,
                Err(msg) => return Ok(Some(msg.yellow().to_string())),
            };
            let attempts =
                create_with_retry(client, key, Some(&attrs), CREATE_RETRIES, CREATE_RETRY_DELAY)
                    .await?;
            let suffix = if attempts > 1 {
                format!(" (after {} attempts)", attempts)
            } else {
                String::new()
            };
            Ok(Some(format!("{} {}{}", "Created".green(), key.cyan(), suffix)))
        }

        "drop" | "d" => {
            let [key] = args else {
                return Ok(Some("Usage: drop <key>".to_string()));
            };
            client.drop(key).await?;
            Ok(Some(format!("{} {}", "Dropped".green(), key.cyan())))
        }

        "set" | "s" => {
            let [key, value] = args else {
                return Ok(Some("Usage: set <key> <value>".to_string()));
            };
            client.set(key, value).await?;
            Ok(Some("Done".green().to_string()))
        }

        "bulk" | "b" => {
            if args.len() < 2 {
                return Ok(Some("Usage: bulk <key> <value>...".to_string()));
            }
            client.bulk(args[0], &args[1..]).await?;
            Ok(Some(format!("{} ({} values)", "Done".green(), args.len() - 1)))
        }

        "list" | "l" => {
            let [key] = args else {
                return Ok(Some("Usage: list <key>".to_string()));
            };
            let count = client.list(key).await?;
            Ok(Some(format!("{} {}", key.cyan(), count.to_string().yellow())))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

/// Parses `precision=N`, `eps=F` and `in_memory` tokens.
fn parse_create_options(options: &[&str]) -> Result<SetAttributes, String> {
    let mut attrs = SetAttributes::new();
    for option in options {
        match option.split_once('=') {
            Some(("precision", value)) => {
                let precision = value
                    .parse()
                    .map_err(|_| format!("invalid precision: {}", value))?;
                attrs = attrs.with_precision(precision);
            }
            Some(("eps", value)) => {
                let eps = value
                    .parse()
                    .map_err(|_| format!("invalid eps: {}", value))?;
                attrs = attrs.with_error_bound(eps);
            }
            Some(("in_memory", value)) => attrs = attrs.with_in_memory(value != "0"),
            None if *option == "in_memory" => attrs = attrs.with_in_memory(true),
            _ => return Err(format!("unknown option: {}", option)),
        }
    }
    Ok(attrs)
}
