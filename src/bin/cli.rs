//! Lottery harvester CLI
//!
//! Local execution entry point; schedulers invoke `update` periodically.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lottery_harvester::{
    error::Result,
    models::{Config, ManifestEntry},
    pipeline::{self, Harvester},
    services::DiscoveryMode,
};

/// harvester - Kerala lottery draw result harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvests lottery draw results into JSON records"
)]
struct Cli {
    /// Storage directory holding config.toml, note/, the manifest and history
    #[arg(short, long, default_value = ".")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Ignore cached pages and link lists
    #[arg(long, global = true)]
    refresh: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest the most recent draws (today and the last few weeks)
    Update {
        /// Number of result links to collect
        #[arg(short, long, default_value_t = 5)]
        count: usize,
    },

    /// Harvest older draws, strictly before today
    Backfill {
        /// Number of result links to collect
        #[arg(short, long, default_value_t = 50)]
        count: usize,
    },

    /// Harvest an explicit list of result page URLs
    Fetch {
        /// Result page URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Rebuild manifest and history from files in the note directory
    Reindex,

    /// Validate configuration file
    Validate,

    /// Show latest draw and collection sizes
    Info,
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

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    log::info!("Storage directory: {}", cli.storage_dir.display());

    match cli.command {
        Command::Update { count } => {
            let harvester = Harvester::new(&config, &cli.storage_dir)?.refresh(cli.refresh);
            harvester.run_discovery(DiscoveryMode::Recent, count).await?;
        }

        Command::Backfill { count } => {
            let harvester = Harvester::new(&config, &cli.storage_dir)?.refresh(cli.refresh);
            harvester
                .run_discovery(DiscoveryMode::Historical, count)
                .await?;
        }

        Command::Fetch { urls } => {
            let harvester = Harvester::new(&config, &cli.storage_dir)?.refresh(cli.refresh);
            harvester.run_urls(&urls).await.log();
        }

        Command::Reindex => {
            pipeline::run_reindex(&config, &cli.storage_dir).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} prize tiers, {} lottery names)",
                config.extraction.tiers.len(),
                config.extraction.lottery_names.len()
            );
        }

        Command::Info => {
            let paths = &config.paths;
            let manifest_path = cli.storage_dir.join(&paths.manifest_file);
            let manifest: Vec<ManifestEntry> = std::fs::read_to_string(&manifest_path)
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok())
                .unwrap_or_default();
            log::info!("Manifest: {} entries", manifest.len());

            let latest_path = cli
                .storage_dir
                .join(&paths.note_dir)
                .join(&paths.latest_file);
            match std::fs::read_to_string(&latest_path)
                .ok()
                .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            {
                Some(latest) => {
                    for field in ["lottery_name", "draw_number", "draw_date"] {
                        if let Some(value) = latest.get(field) {
                            log::info!("Latest {}: {}", field, value);
                        }
                    }
                }
                None => log::info!("No latest draw yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
