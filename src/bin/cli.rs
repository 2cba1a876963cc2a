//! estate-watch CLI
//!
//! Local execution entry point.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use estate_watch::{
    config,
    error::Result,
    models::timestamp,
    pipeline::{self, WatchOptions},
    services,
    storage::{ListingStore, LocalStorage},
};

/// estate-watch - Real-Estate Listing Watcher
#[derive(Parser, Debug)]
#[command(
    name = "estate-watch",
    version,
    about = "Reports new and stale real-estate listings"
)]
struct Cli {
    /// Path to the settings file (TOML, or JSON with a .json extension)
    #[arg(short, long, default_value = "settings.toml")]
    settings: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch listings, update the store and print the selected ones as JSON
    Run(RunArgs),

    /// Validate the settings file and filter
    Validate,

    /// Show store info
    Info,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Report every currently listed offer instead of only new ones
    #[arg(short, long)]
    current: bool,

    /// Report every stored listing
    #[arg(short, long)]
    all: bool,

    /// Do not apply the configured filter
    #[arg(short, long)]
    unfiltered: bool,

    /// Clear the store before processing
    #[arg(short, long)]
    empty: bool,

    /// Do not write the store
    #[arg(short, long)]
    transient: bool,
}

impl From<&RunArgs> for WatchOptions {
    fn from(args: &RunArgs) -> Self {
        Self {
            include_refreshed: args.current,
            all: args.all,
            unfiltered: args.unfiltered,
            empty: args.empty,
            transient: args.transient,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = config::load_settings(&cli.settings)?;
    log::info!("Loaded settings from {}", cli.settings.display());

    match cli.command {
        Command::Run(args) => {
            let source = services::source_from_settings(&settings)?;
            let mut store = ListingStore::load(LocalStorage::new(settings.storage_path())).await;

            let report = pipeline::run_watch(
                &settings,
                &WatchOptions::from(&args),
                source.as_ref(),
                &mut store,
                timestamp::now(),
            )
            .await?;

            println!("{}", serde_json::to_string_pretty(&report.listings)?);
            log::info!("{} listings selected", report.listings.len());
        }

        Command::Validate => {
            log::info!("Validating settings...");
            config::check_filter(&settings)?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            let store = ListingStore::load(LocalStorage::new(settings.storage_path())).await;
            let stats = store.stats();

            log::info!("Store: {}", store.location());
            log::info!("Listings: {}", stats.count);
            if let Some(first) = stats.oldest_first_seen {
                log::info!("Oldest first seen: {}", timestamp::format(&first));
            }
            if let Some(last) = stats.newest_last_seen {
                log::info!("Newest last seen: {}", timestamp::format(&last));
            }
        }
    }

    Ok(())
}
