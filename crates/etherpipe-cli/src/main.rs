//! # etherpipe CLI
//!
//! Entry point for the `etherpipe` binary. Each subcommand connects to the
//! daemon's IPC socket, issues one call and prints the result.
//!
//! Subcommands:
//! - `etherpipe accounts`: list accounts with balance and nonce
//! - `etherpipe block-number`: latest block number
//! - `etherpipe peer-count`: peer count and connection quality
//! - `etherpipe gas-price`: current gas price in ether
//! - `etherpipe new-account`: create a password-protected account
//! - `etherpipe delete-account`: delete an account
//! - `etherpipe unlock`: unlock an account for a while
//! - `etherpipe send`: send ether between accounts

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

/// etherpipe: talk to a node daemon over its local IPC socket.
#[derive(Parser)]
#[command(name = "etherpipe", version, about)]
struct Cli {
    /// Path to a YAML config file (default: ~/.etherpipe/config.yaml).
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// IPC endpoint of the daemon, overriding the config file.
    #[arg(long, global = true)]
    ipc: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List accounts with their balance and transaction count (JSON).
    Accounts,

    /// Print the latest block number.
    BlockNumber,

    /// Print the peer count and connection quality.
    PeerCount,

    /// Print the gas price in ether.
    GasPrice,

    /// Create a new account.
    NewAccount {
        /// Password protecting the new key.
        #[arg(long, env = "ETHERPIPE_PASSWORD")]
        password: String,

        /// Caller-side index echoed back with the result.
        #[arg(long, default_value_t = 0)]
        index: usize,
    },

    /// Delete an account.
    DeleteAccount {
        /// Account address (0x...).
        #[arg(long)]
        account: String,

        /// Password of the account.
        #[arg(long, env = "ETHERPIPE_PASSWORD")]
        password: String,

        #[arg(long, default_value_t = 0)]
        index: usize,
    },

    /// Unlock an account for signing.
    Unlock {
        /// Account address (0x...).
        #[arg(long)]
        account: String,

        /// Password of the account.
        #[arg(long, env = "ETHERPIPE_PASSWORD")]
        password: String,

        /// Unlock duration in seconds.
        #[arg(long, default_value_t = 300)]
        duration: u64,

        #[arg(long, default_value_t = 0)]
        index: usize,
    },

    /// Send ether from an unlocked account.
    Send {
        /// Sender address (0x...).
        #[arg(long)]
        from: String,

        /// Recipient address (0x...).
        #[arg(long)]
        to: String,

        /// Amount in ether (e.g. 0.1).
        #[arg(long)]
        value: f64,
    },
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = commands::load_config(cli.config, cli.ipc)?;

    match cli.command {
        Commands::Accounts => commands::accounts::run(config).await,
        Commands::BlockNumber => commands::query::block_number(config).await,
        Commands::PeerCount => commands::query::peer_count(config).await,
        Commands::GasPrice => commands::query::gas_price(config).await,
        Commands::NewAccount { password, index } => {
            commands::account::create(config, password, index).await
        }
        Commands::DeleteAccount {
            account,
            password,
            index,
        } => commands::account::delete(config, account, password, index).await,
        Commands::Unlock {
            account,
            password,
            duration,
            index,
        } => commands::account::unlock(config, account, password, duration, index).await,
        Commands::Send { from, to, value } => commands::send::run(config, from, to, value).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
