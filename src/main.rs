//! hlld - Command-line client for the hlld HyperLogLog server
//!
//! Provides both a REPL and one-shot command execution.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use hlld_client::{Client, ConnectionConfig};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hlld")]
#[command(about = "Command-line client for the hlld HyperLogLog server")]
#[command(version)]
struct Cli {
    /// Server address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:4553", env = "HLLD_ADDR")]
    server: String,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = 10, env = "HLLD_CONNECT_TIMEOUT")]
    connect_timeout: u64,

    /// Per-command timeout in seconds
    #[arg(short, long, default_value_t = 5, env = "HLLD_TIMEOUT")]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start interactive REPL
    Repl,

    /// Create a set
    Create {
        /// Set name
        key: String,

        /// Register precision (4-18)
        #[arg(short, long)]
        precision: Option<i32>,

        /// Target error bound
        #[arg(short, long)]
        eps: Option<f64>,

        /// Keep the set in memory only
        #[arg(long)]
        in_memory: bool,

        /// Retry this many times while the server reports "Delete in progress"
        #[arg(long, default_value_t = 0)]
        retries: u32,

        /// Delay between retries in milliseconds
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,
    },

    /// Drop a set
    Drop {
        /// Set name
        key: String,
    },

    /// Add a value to a set
    Set {
        /// Set name
        key: String,

        /// Value to add
        value: String,
    },

    /// Add several values to a set
    Bulk {
        /// Set name
        key: String,

        /// Values to add
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Show the estimated cardinality of a set
    List {
        /// Set name
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = ConnectionConfig::new(cli.server.clone())
        .with_connect_timeout(Duration::from_secs(cli.connect_timeout))
        .with_request_timeout(Duration::from_secs(cli.timeout));

    let mut client = Client::connect(&config).await.map_err(|e| {
        eprintln!("{}: {}", "Connection failed".red(), e);
        e
    })?;

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(client, &cli.server).await?;
        }
        Some(cmd) => {
            let result = commands::execute(&mut client, cmd).await;
            let _ = client.close().await;
            match result {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    eprintln!("{}", commands::format_error(&e));
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
