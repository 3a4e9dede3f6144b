//! # Awful Account News
//!
//! Command-line driver: filters one week's fetched articles for every
//! configured account and archives the result.
//!
//! ## Usage
//!
//! ```sh
//! awful_account_news --articles ./fetched.json -o ./briefs --seen-store ./state/seen.json
//! ```
//!
//! The report is always printed to stdout as JSON. Outside `--dry-run` the
//! kept URLs are marked as seen and the report is archived under the ISO week.

use awful_account_news::config::{Settings, load_accounts};
use awful_account_news::outputs::json;
use awful_account_news::runner::{RunOptions, load_fetched, run_accounts};
use awful_account_news::seen::{MemorySeenStore, SeenStore};
use awful_account_news::utils::ensure_writable_dir;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("awful_account_news starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let settings = Settings::from_env();
    let max_results = args.max_results.unwrap_or(settings.articles_per_account);
    info!(
        days_lookback = settings.days_lookback,
        max_results,
        fetch_budget = settings.fetch_budget(),
        similarity_threshold = settings.similarity_threshold,
        "Loaded settings"
    );
    if args.dry_run {
        info!("Dry run: seen URLs and archive will not be written");
    } else if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Archive directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let accounts = load_accounts(&args.accounts).await?;
    let fetched = load_fetched(&args.articles).await?;
    info!(
        accounts = accounts.len(),
        fetched_accounts = fetched.len(),
        "Loaded inputs"
    );

    let seen_store = match &args.seen_store {
        Some(path) => Some(Arc::new(MemorySeenStore::load(path).await?)),
        None => None,
    };

    let pipeline = Arc::new(settings.pipeline());
    let options = RunOptions {
        max_results,
        concurrency: args.concurrency,
        dry_run: args.dry_run,
    };
    let report = run_accounts(
        pipeline,
        &accounts,
        &fetched,
        seen_store.clone().map(|s| s as Arc<dyn SeenStore>),
        options,
    )
    .await;

    if !args.dry_run {
        if let (Some(store), Some(path)) = (&seen_store, &args.seen_store)
            && let Err(e) = store.save(path).await
        {
            error!(path = %path, error = %e, "Failed to save seen-URL snapshot");
        }
        if let Err(e) = json::write_report(&report, &args.output_dir).await {
            error!(error = %e, "Failed to write run archive");
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    for err in &report.stats.errors {
        warn!(error = %err, "Account error");
    }
    let elapsed = start_time.elapsed();
    info!(
        run_key = %report.run_key,
        accounts_processed = report.stats.accounts_processed,
        accounts_total = accounts.len(),
        total_articles_fetched = report.stats.total_articles_fetched,
        total_articles_kept = report.stats.total_articles_kept,
        errors = report.stats.errors.len(),
        ?elapsed,
        "Execution complete"
    );

    Ok(())
}
