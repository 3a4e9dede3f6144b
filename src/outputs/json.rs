//! JSON archive of run reports.
//!
//! Each run is written to `{output_dir}/{run_key}.json`, where the run key is
//! the ISO week. A second run in the same week replaces the earlier archive,
//! which keeps reruns idempotent.

use crate::models::RunReport;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Path of the archive file for `run_key` under `output_dir`.
pub fn report_path(output_dir: &str, run_key: &str) -> PathBuf {
    PathBuf::from(output_dir).join(format!("{}.json", run_key))
}

/// Write a [`RunReport`] to its weekly archive file.
///
/// Creates `output_dir` if needed. An archive already present for the same
/// run key is replaced.
///
/// # Arguments
///
/// * `report` - The run report to serialize
/// * `output_dir` - Base directory for archives
///
/// # Returns
///
/// The path written (`{output_dir}/{run_key}.json`), or an error if
/// directory creation or file writing fails.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, run_key = %report.run_key))]
pub async fn write_report(report: &RunReport, output_dir: &str) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create archive dir");
        return Err(e.into());
    }

    let path = report_path(output_dir, &report.run_key);
    info!(path = %path.display(), "Writing JSON");
    fs::write(&path, json).await?;
    info!(
        path = %path.display(),
        accounts = report.digests.len(),
        "Archived run report"
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountDigest, RunStats};

    fn report(run_key: &str, company: &str) -> RunReport {
        RunReport {
            run_key: run_key.to_string(),
            dry_run: false,
            generated_at: "2024-03-20T10:00:00Z".to_string(),
            digests: vec![AccountDigest {
                company: company.to_string(),
                website: format!("{}.com", company.to_lowercase()),
                articles_fetched: 3,
                articles_unseen: 2,
                article_count: 0,
                articles: Vec::new(),
                links: Vec::new(),
            }],
            stats: RunStats::default(),
        }
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path("/tmp/briefs", "2024-W12"),
            PathBuf::from("/tmp/briefs/2024-W12.json")
        );
    }

    #[tokio::test]
    async fn test_write_report_creates_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("briefs");
        let out = out.to_str().unwrap();

        let path = write_report(&report("2024-W12", "Acme"), out).await.unwrap();
        assert!(path.ends_with("2024-W12.json"));

        write_report(&report("2024-W12", "Globex"), out).await.unwrap();
        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: RunReport = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.digests[0].company, "Globex");
        assert_eq!(parsed.digests[0].articles_unseen, 2);
    }
}
