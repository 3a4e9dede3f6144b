//! Per-account driver around the filter pipeline.
//!
//! For each configured account the driver takes the articles the fetch layer
//! gathered, drops URLs already delivered in earlier runs, runs the
//! [`ArticleFilterPipeline`], and (outside dry runs) marks the survivors as
//! seen. Accounts are processed concurrently on the blocking thread pool; one
//! failing account is recorded in the run stats and never stops the others.

use crate::filter::ArticleFilterPipeline;
use crate::models::{AccountConfig, AccountDigest, ArticleLink, ArticleRecord, RunReport, RunStats};
use crate::seen::SeenStore;
use crate::utils::current_run_key;
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tokio::{fs, task};
use tracing::{Span, info, instrument, warn};

/// Fetched articles keyed by company name.
pub type FetchedArticles = HashMap<String, Vec<ArticleRecord>>;

/// Knobs for one driver run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub max_results: usize,
    /// Accounts in flight at once; `0` is treated as `1`.
    pub concurrency: usize,
    pub dry_run: bool,
}

/// Read the fetch layer's dump: a JSON object of company name to article list.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_fetched(path: impl AsRef<Path>) -> Result<FetchedArticles, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// Filter one account's articles.
///
/// Records are hashed before the seen-URL check so the store can match them;
/// the pipeline then re-derives the same hashes on its own copy.
///
/// # Arguments
///
/// * `pipeline` - The filter pipeline shared by every account
/// * `account` - The account being processed
/// * `fetched` - Raw articles the fetch layer gathered for this account
/// * `seen` - Seen-URL store; `None` disables cross-run suppression
/// * `options` - Result cap and dry-run flag
///
/// # Returns
///
/// The account's [`AccountDigest`], or an error if the account has no
/// company name.
#[instrument(level = "info", skip_all, fields(company = %account.company))]
pub fn process_account(
    pipeline: &ArticleFilterPipeline,
    account: &AccountConfig,
    fetched: &[ArticleRecord],
    seen: Option<&dyn SeenStore>,
    options: RunOptions,
) -> Result<AccountDigest, Box<dyn Error>> {
    if account.company.trim().is_empty() {
        return Err("account has an empty company name".into());
    }

    let articles_fetched = fetched.len();
    info!(articles_fetched, "Fetched raw articles");

    let candidates = match seen {
        Some(store) => {
            let hashed = ArticleFilterPipeline::enriched(fetched);
            let unseen = store.filter_unseen(&account.company, &hashed);
            info!(unseen = unseen.len(), "After filtering seen URLs");
            unseen
        }
        None => fetched.to_vec(),
    };
    let articles_unseen = candidates.len();

    let kept = pipeline.filter_and_dedupe(&candidates, options.max_results);
    info!(kept = kept.len(), "After filtering and deduplication");

    if let Some(store) = seen
        && !options.dry_run
        && !kept.is_empty()
    {
        let (hashes, dates): (Vec<String>, Vec<String>) = kept
            .iter()
            .filter(|r| !r.url_hash.is_empty())
            .map(|r| (r.url_hash.clone(), r.published_at.clone().unwrap_or_default()))
            .unzip();
        store.mark_seen(&account.company, &hashes, &dates);
    }

    Ok(AccountDigest {
        company: account.company.clone(),
        website: account.website.clone(),
        articles_fetched,
        articles_unseen,
        article_count: kept.len(),
        links: ArticleLink::from_records(&kept),
        articles: kept,
    })
}

/// Process every account and assemble the run report.
///
/// Each account runs [`process_account`] on tokio's blocking pool, with at
/// most `options.concurrency` accounts in flight. Digests come back in
/// account order regardless of completion order.
#[instrument(level = "info", skip_all, fields(accounts = accounts.len(), dry_run = options.dry_run))]
pub async fn run_accounts(
    pipeline: Arc<ArticleFilterPipeline>,
    accounts: &[AccountConfig],
    fetched: &FetchedArticles,
    seen: Option<Arc<dyn SeenStore>>,
    options: RunOptions,
) -> RunReport {
    for company in fetched.keys() {
        if !accounts.iter().any(|a| &a.company == company) {
            warn!(%company, "Fetched articles for an unconfigured account; ignoring");
        }
    }

    let results: Vec<(String, Result<AccountDigest, String>)> = stream::iter(accounts)
        .map(|account| {
            let articles = fetched.get(&account.company).cloned().unwrap_or_default();
            if articles.is_empty() {
                info!(company = %account.company, "No articles found");
            }
            let company = account.company.clone();
            let account = account.clone();
            let pipeline = Arc::clone(&pipeline);
            let seen = seen.clone();
            let span = Span::current();

            let handle = task::spawn_blocking(move || {
                let _entered = span.enter();
                process_account(&pipeline, &account, &articles, seen.as_deref(), options)
                    .map_err(|e| e.to_string())
            });

            async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(format!("worker task failed: {}", e)),
                };
                (company, result)
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let mut stats = RunStats::default();
    let mut digests = Vec::with_capacity(results.len());
    for (company, result) in results {
        match result {
            Ok(digest) => {
                stats.accounts_processed += 1;
                stats.total_articles_fetched += digest.articles_fetched;
                stats.total_articles_kept += digest.article_count;
                digests.push(digest);
            }
            Err(e) => {
                let message = format!("Error processing {}: {}", company, e);
                warn!(%company, error = %e, "Account failed; continuing");
                stats.errors.push(message);
            }
        }
    }

    RunReport {
        run_key: current_run_key(),
        dry_run: options.dry_run,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        digests,
        stats,
    }
}
