// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Antispam - score-based spam moderation for Telegram groups.
//!
//! This is the binary entry point for the bot and its maintenance tools.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod download;
mod replay;
mod serve;

use std::path::PathBuf;

use antispam_config::model::AntispamConfig;
use clap::{Parser, Subcommand};
use tracing::error;

/// Antispam - score-based spam moderation for Telegram groups.
#[derive(Parser, Debug)]
#[command(name = "antispam", version, about, long_about = None)]
struct Cli {
    /// Path to a config file, replacing the default search locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the moderation bot (default).
    Serve,
    /// Re-classify recent messages from the audit log and report changed verdicts.
    Replay {
        /// How many days of history to replay.
        #[arg(long, default_value_t = 10)]
        days: u32,
        /// Number of concurrent classifications.
        #[arg(long, default_value_t = 10)]
        workers: usize,
    },
    /// Download attachments referenced by the audit log.
    Download {
        /// How many days of history to scan.
        #[arg(long, default_value_t = 10)]
        days: u32,
        /// Number of concurrent downloads.
        #[arg(long, default_value_t = 5)]
        workers: usize,
        /// Directory the files are written to.
        #[arg(long, default_value = "./files")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let loaded = match &cli.config {
        Some(path) => antispam_config::load_and_validate_path(path),
        None => antispam_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            antispam_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Replay { days, workers } => replay::run_replay(config, days, workers).await,
        Commands::Download {
            days,
            workers,
            output,
        } => download::run_download(config, days, workers, output).await,
    };

    if let Err(e) = result {
        error!(error = %e, "antispam exited with an error");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides `bot.log_level`.
fn init_tracing(config: &AntispamConfig) {
    use tracing_subscriber::EnvFilter;

    let level = &config.bot.log_level;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("antispam={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
