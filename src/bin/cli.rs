//! letterboxd-mirror CLI
//!
//! Local and scheduled execution entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use letterboxd_mirror::{
    config,
    error::Result,
    models::{Config, DedupStrategy},
    pipeline,
    services::{AuthSession, HttpFeedSource, OAuthTokenProvider},
    storage::{Ledger, SinkSession, WordPressSink},
    utils::http,
};

/// How many ledger ids `ledger show` prints.
const SHOW_RECENT: usize = 10;

/// letterboxd-mirror - Letterboxd diary to WordPress.com
#[derive(Parser, Debug)]
#[command(
    name = "letterboxd-mirror",
    version,
    about = "Mirror a Letterboxd feed into WordPress.com posts"
)]
struct Cli {
    /// Path to the TOML config file (default: config.toml, used if present).
    /// Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish new feed entries
    Sync {
        /// Maximum posts created in this run
        #[arg(long)]
        max_posts: Option<usize>,

        /// Pause between posts, in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,

        /// Dedup strategy: ledger, full-scan or point-lookup
        #[arg(long)]
        strategy: Option<DedupStrategy>,

        /// Log what would be published without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration
    Validate,

    /// Inspect or rebuild the published-id ledger
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
}

#[derive(Subcommand, Debug)]
enum LedgerAction {
    /// Print the stored ledger
    Show,

    /// Recompute the ledger from existing posts and store it
    Rebuild,
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
async fn main() -> ExitCode {
    // A missing .env is fine; the real environment still applies.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;

    let client = http::create_client(&config.http)?;
    let sink = WordPressSink::from_config(client.clone(), &config.site)?;
    let auth = AuthSession::new(
        config.auth.access_token.clone(),
        config.auth.refresh_token.clone(),
        Box::new(OAuthTokenProvider::new(
            client.clone(),
            &config.site,
            &config.auth,
        )),
    );
    let session = SinkSession::new(&sink, &auth);

    match cli.command {
        Command::Sync {
            max_posts,
            delay_ms,
            strategy,
            dry_run,
        } => {
            if let Some(max_posts) = max_posts {
                config.sync.max_posts_per_run = max_posts;
            }
            if let Some(delay_ms) = delay_ms {
                config.sync.post_delay_ms = delay_ms;
            }
            if let Some(strategy) = strategy {
                config.sync.strategy = strategy;
            }
            config.sync.dry_run |= dry_run;
            config.validate()?;

            let feed = HttpFeedSource::from_config(client, &config.feed);
            log::info!("Reading {}", config.feed.rss_url());

            let outcome = pipeline::run_sync(&config, &feed, session).await?;
            if outcome.cap_reached {
                log::info!("More entries may be waiting; they will be picked up next run");
            }
            log::info!("Done!");
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            log::info!("Feed: {}", config.feed.rss_url());
            log::info!(
                "Site: {} (category {})",
                config.site.site,
                config.site.category_id
            );
            log::info!(
                "Sync: strategy {}, {} posts per run, {}ms between posts",
                config.sync.strategy,
                config.sync.max_posts_per_run,
                config.sync.post_delay_ms
            );
            log::info!(
                "Auth: {}",
                if config.auth.access_token.is_some() {
                    "access token + refresh token"
                } else {
                    "refresh token only (will refresh on first call)"
                }
            );
            log::info!("All validations passed!");
        }

        Command::Ledger { action } => match action {
            LedgerAction::Show => {
                let key = &config.sync.ledger_key;
                match session.get_setting(key).await? {
                    Some(value) => {
                        let ledger = Ledger::parse(&value, config.sync.ledger_cap);
                        log::info!("Ledger '{}' holds {} ids", key, ledger.len());
                        for id in ledger.newest().take(SHOW_RECENT) {
                            log::info!("  {id}");
                        }
                    }
                    None => log::info!("No ledger stored under '{key}'"),
                }
            }
            LedgerAction::Rebuild => {
                let ledger = pipeline::rebuild_ledger(&config.sync, &session).await?;
                log::info!("Stored {} ids under '{}'", ledger.len(), config.sync.ledger_key);
            }
        },
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = config::load(path)?;
    let file = path.unwrap_or(Path::new(config::DEFAULT_PATH));
    log::debug!("Loaded configuration (config file: {})", file.display());
    Ok(config)
}
