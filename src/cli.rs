//! Command-line interface definitions for Awful Account News.
//!
//! All options can be provided via command-line flags; the ones that usually
//! differ per deployment also read environment variables.

use clap::Parser;

/// Command-line arguments for the Awful Account News filter run.
///
/// # Examples
///
/// ```sh
/// # Filter a fetched batch and print the report
/// awful_account_news --articles ./fetched.json --dry-run
///
/// # Full run: remember delivered URLs and archive the weekly report
/// awful_account_news --articles ./fetched.json -a config/accounts.yaml \
///     -o ./briefs --seen-store ./state/seen.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON file mapping each company name to its fetched articles
    #[arg(long)]
    pub articles: String,

    /// Accounts file (YAML or JSON)
    #[arg(short, long, env = "ACCOUNTS_FILE", default_value = "config/accounts.yaml")]
    pub accounts: String,

    /// Directory for the weekly JSON archive
    #[arg(short, long, env = "ARCHIVE_DIR", default_value = "briefs")]
    pub output_dir: String,

    /// JSON snapshot of previously delivered URLs; disables seen tracking when absent
    #[arg(long, env = "SEEN_STORE")]
    pub seen_store: Option<String>,

    /// Override ARTICLES_PER_ACCOUNT for this run
    #[arg(long)]
    pub max_results: Option<usize>,

    /// Accounts processed concurrently
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Print the report without marking URLs seen or writing the archive
    #[arg(long)]
    pub dry_run: bool,
}
