// `backfill plan`: dry run that reports what `sync` would do.

use anyhow::Context;
use clap::Args;

use backfill_common::histogram::total;
use backfill_engine::git::worker::GitWorker;
use backfill_engine::gitlab::GitlabClient;
use backfill_engine::pipeline::{self, RunOptions, RunReport};

use super::CommonArgs;
use crate::exit_code::ExitCode;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    common: CommonArgs,
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.common.json);

    match super::block_on(plan(&args)).and_then(|result| result) {
        Ok(report) => {
            if !report.anomalies.is_empty() {
                output::print_warning(format, "LOCAL_EXCESS", &super::sync::anomaly_summary(&report));
            }
            output::print_output(format, &report, format_human)?;
            Ok(())
        }
        Err(e) => {
            output::print_error(format, ExitCode::from_error(&e).label(), &format!("{e:#}"));
            Err(e)
        }
    }
}

async fn plan(args: &PlanArgs) -> anyhow::Result<RunReport> {
    let config = args.common.load_config()?;
    let worker = GitWorker::new(&config.repo.path);
    let client = GitlabClient::new(&config.gitlab).context("failed to set up GitLab client")?;
    let options = RunOptions { dry_run: true, skip_push: true };
    let report = pipeline::run(&config, options, &worker, &client).await?;
    Ok(report)
}

fn format_human(report: &RunReport) -> String {
    let mut lines = Vec::new();

    match &report.latest_commit {
        Some(hash) => lines.push(format!(
            "Local history: {} commit(s), latest {}",
            total(&report.local_histogram),
            short_hash(hash)
        )),
        None => lines.push("Local history: empty".to_string()),
    }
    let window = match report.after {
        Some(after) => format!("after {after}"),
        None => "full history".to_string(),
    };
    lines.push(format!(
        "GitLab activity ({window}): {} event(s), {} single-commit push(es)",
        report.fetched_events, report.counted_events
    ));

    if report.deficits.is_empty() {
        lines.push("Nothing to create.".to_string());
    } else {
        lines.push(format!("Would create {} commit(s):", report.planned_commits));
        for deficit in &report.deficits {
            lines.push(format!("  {}  +{}", deficit.date, deficit.count));
        }
    }

    if !report.anomalies.is_empty() {
        lines.push(format!("Local excess on {} day(s):", report.anomalies.len()));
        for anomaly in &report.anomalies {
            lines.push(format!(
                "  {}  local {} vs GitLab {}",
                anomaly.date, anomaly.local, anomaly.remote
            ));
        }
    }

    lines.join("\n")
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backfill_common::reconcile::{Anomaly, Deficit};
    use chrono::NaiveDate;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_report() -> RunReport {
        let mut report = RunReport {
            dry_run: true,
            latest_commit: Some("0123456789abcdef0123456789abcdef01234567".into()),
            after: Some(ymd(2023, 12, 25)),
            fetched_events: 4,
            counted_events: 3,
            deficits: vec![Deficit { date: ymd(2024, 1, 2), count: 2 }],
            planned_commits: 2,
            anomalies: vec![Anomaly { date: ymd(2024, 1, 1), local: 3, remote: 1 }],
            ..RunReport::default()
        };
        report.local_histogram.insert(ymd(2024, 1, 1), 3);
        report
    }

    #[test]
    fn human_format_shows_plan_and_anomalies() {
        let output = format_human(&sample_report());
        assert!(output.contains("Local history: 3 commit(s), latest 0123456789ab"));
        assert!(output.contains("GitLab activity (after 2023-12-25): 4 event(s), 3 single-commit push(es)"));
        assert!(output.contains("Would create 2 commit(s):"));
        assert!(output.contains("2024-01-02  +2"));
        assert!(output.contains("2024-01-01  local 3 vs GitLab 1"));
    }

    #[test]
    fn human_format_for_empty_repository() {
        let report = RunReport { dry_run: true, empty_history: true, ..RunReport::default() };
        let output = format_human(&report);
        assert!(output.contains("Local history: empty"));
        assert!(output.contains("full history"));
        assert!(output.contains("Nothing to create."));
    }

    #[test]
    fn json_output_carries_deficits() {
        let mut buf = Vec::new();
        output::write_output(&mut buf, OutputFormat::Json, &sample_report(), format_human).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["dry_run"], true);
        assert_eq!(parsed["deficits"][0]["date"], "2024-01-02");
        assert_eq!(parsed["deficits"][0]["count"], 2);
        assert_eq!(parsed["planned_commits"], 2);
        assert_eq!(parsed["local_histogram"]["2024-01-01"], 3);
    }
}
