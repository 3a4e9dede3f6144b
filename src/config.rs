//! Run settings and account loading.
//!
//! Numeric knobs come from the environment with built-in defaults; the
//! domain lists are fixed here. Accounts are read from a YAML (`.yaml`/`.yml`)
//! or JSON file with a top-level `accounts:` list.

use crate::filter::{ArticleFilterPipeline, DEFAULT_SIMILARITY_THRESHOLD, DomainPolicy};
use crate::models::{AccountConfig, AccountsFile};
use std::env;
use std::error::Error;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::{info, instrument, warn};

pub const ENV_DAYS_LOOKBACK: &str = "DAYS_LOOKBACK";
pub const ENV_ARTICLES_PER_ACCOUNT: &str = "ARTICLES_PER_ACCOUNT";
pub const ENV_SIMILARITY_THRESHOLD: &str = "TITLE_SIMILARITY_THRESHOLD";

pub const DEFAULT_DAYS_LOOKBACK: u32 = 7;
pub const DEFAULT_ARTICLES_PER_ACCOUNT: usize = 12;
/// The fetch layer asks for this many times `articles_per_account`.
pub const ARTICLES_FETCH_MULTIPLIER: usize = 3;
pub const DEFAULT_ACCOUNTS_PATH: &str = "config/accounts.yaml";

pub const ALLOWED_DOMAINS: &[&str] = &[
    "businesswire.com",
    "prnewswire.com",
    "globenewswire.com",
    "reuters.com",
    "bloomberg.com",
    "wsj.com",
    "techcrunch.com",
    "theverge.com",
    "zdnet.com",
    "venturebeat.com",
    "axios.com",
    "forbes.com",
    "ft.com",
    "cnbc.com",
    "marketwatch.com",
];

pub const BLOCKED_DOMAINS: &[&str] = &[
    "seekingalpha.com",
    "fool.com",
    "benzinga.com",
    "stocktwits.com",
    "finance.yahoo.com",
    "investing.com",
    "marketbeat.com",
    "gurufocus.com",
    "tipranks.com",
];

/// Knobs for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// How far back the fetch layer searches; passed through, not used by the filter.
    pub days_lookback: u32,
    pub articles_per_account: usize,
    pub similarity_threshold: f64,
    pub allowed_domains: Vec<String>,
    pub blocked_domains: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            days_lookback: DEFAULT_DAYS_LOOKBACK,
            articles_per_account: DEFAULT_ARTICLES_PER_ACCOUNT,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            allowed_domains: ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            blocked_domains: BLOCKED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    ///
    /// Unparseable values are logged and ignored. A threshold outside
    /// `(0, 1]` is ignored as well.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(days) = parse_var(&lookup, ENV_DAYS_LOOKBACK) {
            settings.days_lookback = days;
        }
        if let Some(count) = parse_var(&lookup, ENV_ARTICLES_PER_ACCOUNT) {
            settings.articles_per_account = count;
        }
        if let Some(threshold) = parse_var::<f64, _>(&lookup, ENV_SIMILARITY_THRESHOLD) {
            if threshold > 0.0 && threshold <= 1.0 {
                settings.similarity_threshold = threshold;
            } else {
                warn!(threshold, "Similarity threshold out of range; using default");
            }
        }
        settings
    }

    /// How many raw articles the fetch layer should gather per account.
    ///
    /// Over-fetching leaves the filter room to drop blocked and duplicate
    /// stories and still fill `articles_per_account`.
    pub fn fetch_budget(&self) -> usize {
        self.articles_per_account * ARTICLES_FETCH_MULTIPLIER
    }

    pub fn domain_policy(&self) -> DomainPolicy {
        DomainPolicy::new(&self.allowed_domains, &self.blocked_domains)
    }

    pub fn pipeline(&self) -> ArticleFilterPipeline {
        ArticleFilterPipeline::new(self.domain_policy(), self.similarity_threshold)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable setting");
            None
        }
    }
}

/// Parse account definitions; `.yaml`/`.yml` names are YAML, anything else JSON.
pub fn parse_accounts(name: &str, content: &str) -> Result<Vec<AccountConfig>, Box<dyn Error>> {
    let file: AccountsFile = if name.ends_with(".yaml") || name.ends_with(".yml") {
        serde_yaml::from_str(content)?
    } else {
        serde_json::from_str(content)?
    };
    Ok(file.accounts)
}

/// Load account definitions from disk.
///
/// # Arguments
///
/// * `path` - Accounts file; `.yaml`/`.yml` is parsed as YAML, anything else as JSON
///
/// # Returns
///
/// The configured accounts in file order, or an error if the file cannot be
/// read or parsed.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountConfig>, Box<dyn Error>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).await?;
    let accounts = parse_accounts(&path.to_string_lossy(), &content)?;
    info!(count = accounts.len(), "Loaded accounts");
    Ok(accounts)
}
