//! `chunkfs` command-line entry point.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chunkfs")]
#[command(version)]
#[command(about = "Store, fetch and inspect files kept as fixed-size chunks")]
struct Cli {
    /// Configuration file path (default: ~/.config/chunkfs/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Store root directory, overriding the configuration file
    #[arg(long)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload a local file
    Put {
        /// Local file to read
        local: PathBuf,
        /// Destination, e.g. `chunkfs://docs/report.pdf`
        uri: String,
    },

    /// Download a file
    Get {
        uri: String,
        /// Local destination (default: the file's path under the current directory)
        local: Option<PathBuf>,
    },

    /// Write a file's contents to stdout
    Cat {
        uri: String,
        /// Start at this byte offset
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Stop after this many bytes
        #[arg(long)]
        length: Option<u64>,
    },

    /// Print size, chunk size and checksum as JSON
    Stat { uri: String },

    /// Delete a file and all its chunks
    Rm { uri: String },

    /// Compare a local file's checksum with the stored one
    Verify { local: PathBuf, uri: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store_root = store;
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        store = %config.store_root.display(),
        "starting chunkfs"
    );

    let fs = commands::open_fs(&config)?;
    match cli.command {
        Command::Put { local, uri } => commands::put(&fs, &local, &uri),
        Command::Get { uri, local } => commands::get(&fs, &uri, local),
        Command::Cat {
            uri,
            offset,
            length,
        } => commands::cat(&fs, &uri, offset, length),
        Command::Stat { uri } => commands::stat(&fs, &uri),
        Command::Rm { uri } => commands::rm(&fs, &uri),
        Command::Verify { local, uri } => commands::verify(&fs, &local, &uri),
    }
}
