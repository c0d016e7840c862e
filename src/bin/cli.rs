//! Bridge watcher CLI
//!
//! Fetches Tor bridge listings, records new bridges per category and notifies
//! a Telegram chat. `normalize-all` is meant to be scheduled separately.

use std::path::PathBuf;

use bridgewatch::{
    config,
    error::Result,
    models::{Category, Config},
    pipeline,
    services::{HttpBridgeSource, LogNotifier, Notifier, TelegramNotifier},
    storage::{BridgeStore, LocalStorage},
};
use clap::{Parser, Subcommand};

/// bridgewatch - Tor bridge listing watcher
#[derive(Parser, Debug)]
#[command(
    name = "bridgewatch",
    version,
    about = "Tracks published Tor bridges and reports new ones"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "bridgewatch.toml")]
    config: PathBuf,

    /// Override the directory holding the category stores
    #[arg(short, long)]
    store_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch bridges, store new ones and send notifications
    Run {
        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },

    /// De-duplicate and sort every category store
    NormalizeAll,

    /// Validate the configuration
    Validate,

    /// Show record counts per category
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build the collaborators and run one cycle.
async fn run(config: &Config, storage: &LocalStorage, dry_run: bool) -> Result<()> {
    let source = HttpBridgeSource::new(&config.fetch)?;
    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(LogNotifier::new(config.notifier.chunk_limit))
    } else {
        Box::new(TelegramNotifier::from_config(&config.notifier)?)
    };

    let summary = pipeline::run_cycle(config, &source, storage, notifier.as_ref()).await?;
    if summary.fetch_failed {
        log::warn!("Run finished without any fetched bridges");
    }
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Commands that touch the network or the stores need a valid config.
    let mut config = match cli.command {
        Command::Run { .. } | Command::NormalizeAll => match config::load_validated(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Skipping {:?}: {}", cli.command, e);
                return Ok(());
            }
        },
        Command::Validate | Command::Info => config::load_config(&cli.config),
    };
    if let Some(dir) = cli.store_dir {
        config.storage.dir = dir;
    }
    let storage = LocalStorage::new(&config.storage.dir);
    log::debug!("Using store directory {}", storage.root_dir().display());

    match cli.command {
        Command::Run { dry_run } => {
            // Cycle failures are logged, never surfaced as a process error.
            if let Err(e) = run(&config, &storage, dry_run).await {
                log::error!("Run failed: {}", e);
            }
        }

        Command::NormalizeAll => {
            let outcome = pipeline::run_normalize_all(&storage).await;
            if !outcome.failed.is_empty() {
                log::error!("{} store(s) could not be normalized", outcome.failed.len());
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} sources)", config.sources.len());
            if config.notifier.bot_token.is_none() || config.notifier.chat_id.is_none() {
                log::warn!("Telegram credentials missing; only `run --dry-run` will work");
            }
        }

        Command::Info => {
            log::info!("Store directory: {}", storage.root_dir().display());
            for category in Category::ALL {
                match storage.load(category).await {
                    Ok(records) => log::info!("{}: {} bridge(s)", category, records.len()),
                    Err(e) => log::warn!("{}: unreadable ({})", category, e),
                }
            }
        }
    }

    Ok(())
}
