// One reconciliation run: local history → remote activity → deficits →
// synthesized commits → committer-date rewrite → force-push.
//
// Every phase runs to completion before the next one starts.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use backfill_common::events::single_commit_pushes;
use backfill_common::histogram::build_histogram;
use backfill_common::reconcile::{reconcile, Anomaly, Deficit};
use backfill_common::types::DateHistogram;

use crate::config::Config;
use crate::git::history::{read_history_or_empty, HistoryError};
use crate::git::publish::{rewrite_and_publish, PublishTarget};
use crate::git::synth::synthesize;
use crate::git::worker::{CommandExecutor, GitWorker, GitWorkerError};
use crate::gitlab::{ActivitySource, FetchError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after computing deficits; leave the repository untouched.
    pub dry_run: bool,
    /// Synthesize and rewrite, but do not push.
    pub skip_push: bool,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to read local history")]
    History(#[from] HistoryError),

    #[error("failed to fetch remote activity")]
    Fetch(#[from] FetchError),

    #[error("failed to create commits")]
    Synthesize(#[source] GitWorkerError),

    #[error("failed to rewrite or publish history")]
    Publish(#[source] GitWorkerError),
}

/// Everything a run observed and did.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub dry_run: bool,
    pub empty_history: bool,
    pub latest_commit: Option<String>,
    /// Lower bound sent to the feed, if any.
    pub after: Option<NaiveDate>,
    /// Events returned by the feed before filtering.
    pub fetched_events: usize,
    /// Single-commit pushes kept after filtering.
    pub counted_events: usize,
    pub local_histogram: DateHistogram,
    pub remote_histogram: DateHistogram,
    pub deficits: Vec<Deficit>,
    pub anomalies: Vec<Anomaly>,
    /// Sum of all deficits.
    pub planned_commits: u64,
    pub commits_created: u64,
    pub rewritten: bool,
    pub published: bool,
}

/// Lower bound for the feed query: `lookback_days` before the latest local commit.
pub fn lookback_bound(latest: Option<NaiveDate>, lookback_days: u32) -> Option<NaiveDate> {
    latest.map(|date| {
        date.checked_sub_days(Days::new(u64::from(lookback_days))).unwrap_or(NaiveDate::MIN)
    })
}

pub async fn run<E, S>(
    config: &Config,
    options: RunOptions,
    worker: &GitWorker<E>,
    source: &S,
) -> Result<RunReport, PipelineError>
where
    E: CommandExecutor,
    S: ActivitySource + ?Sized,
{
    let bucket = config.reconcile.date_bucket;
    let mut report = RunReport { dry_run: options.dry_run, ..RunReport::default() };

    info!(repo = %worker.repo_path().display(), "Checking existing history in local repo...");
    let history = read_history_or_empty(worker)?;
    if history.is_empty() {
        info!("> No commits found in repo, continuing.");
    } else {
        info!(commits = history.len(), "> Found existing history.");
    }
    report.empty_history = history.is_empty();
    report.latest_commit = history.latest().map(|commit| commit.hash.clone());
    report.local_histogram = build_histogram(&history.commits, bucket);

    info!("Pulling history from GitLab...");
    report.after = lookback_bound(
        history.latest().map(|commit| bucket.date_of(&commit.date)),
        config.reconcile.lookback_days,
    );
    let events = source.fetch_events(report.after).await?;
    report.fetched_events = events.len();
    let pushes = single_commit_pushes(events);
    report.counted_events = pushes.len();
    report.remote_histogram = build_histogram(&pushes, bucket);

    let plan = reconcile(&report.local_histogram, &report.remote_histogram);
    for anomaly in &plan.anomalies {
        warn!(
            date = %anomaly.date,
            local = anomaly.local,
            remote = anomaly.remote,
            "Local commit count is higher than GitLab count for {} (by {})",
            anomaly.date,
            anomaly.excess()
        );
    }
    report.planned_commits = plan.total_commits();
    report.deficits = plan.deficits;
    report.anomalies = plan.anomalies;

    if options.dry_run {
        info!(planned = report.planned_commits, "dry run, repository left untouched");
        return Ok(report);
    }

    info!("Creating missing commits...");
    report.commits_created =
        synthesize(worker, &report.deficits, bucket).map_err(PipelineError::Synthesize)?;

    let target = PublishTarget {
        remote: &config.repo.remote,
        branch: &config.repo.branch,
        skip_push: options.skip_push,
    };
    let outcome = rewrite_and_publish(
        worker,
        report.latest_commit.as_deref(),
        report.commits_created,
        &target,
    )
    .map_err(PipelineError::Publish)?;
    report.rewritten = outcome.rewritten;
    report.published = outcome.published;

    info!(created = report.commits_created, published = report.published, "reconciliation finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn lookback_subtracts_days_from_latest_commit() {
        assert_eq!(lookback_bound(Some(ymd(2024, 3, 5)), 7), Some(ymd(2024, 2, 27)));
        assert_eq!(lookback_bound(Some(ymd(2024, 3, 5)), 0), Some(ymd(2024, 3, 5)));
    }

    #[test]
    fn empty_history_has_no_lower_bound() {
        assert_eq!(lookback_bound(None, 7), None);
    }
}
