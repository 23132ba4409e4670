// `backfill sync`: full reconciliation run.

use anyhow::Context;
use clap::Args;

use backfill_engine::git::worker::GitWorker;
use backfill_engine::gitlab::GitlabClient;
use backfill_engine::pipeline::{self, RunOptions, RunReport};

use super::CommonArgs;
use crate::exit_code::ExitCode;
use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Remote to force-push to (overrides repo.remote).
    #[arg(long)]
    remote: Option<String>,

    /// Branch to force-push (overrides repo.branch).
    #[arg(long)]
    branch: Option<String>,

    /// Create and rewrite commits, but leave the remote alone.
    #[arg(long)]
    skip_push: bool,
}

pub fn run(args: SyncArgs) -> anyhow::Result<()> {
    let format = OutputFormat::detect(args.common.json);
    let options = RunOptions { dry_run: false, skip_push: args.skip_push };

    match super::block_on(sync(&args, options)).and_then(|result| result) {
        Ok(report) => {
            if !report.anomalies.is_empty() {
                output::print_warning(format, "LOCAL_EXCESS", &anomaly_summary(&report));
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

async fn sync(args: &SyncArgs, options: RunOptions) -> anyhow::Result<RunReport> {
    let mut config = args.common.load_config()?;
    if let Some(remote) = &args.remote {
        config.repo.remote = remote.clone();
    }
    if let Some(branch) = &args.branch {
        config.repo.branch = branch.clone();
    }

    let worker = GitWorker::new(&config.repo.path);
    let client = GitlabClient::new(&config.gitlab).context("failed to set up GitLab client")?;
    let report = pipeline::run(&config, options, &worker, &client).await?;
    Ok(report)
}

pub(crate) fn anomaly_summary(report: &RunReport) -> String {
    let dates: Vec<String> = report
        .anomalies
        .iter()
        .map(|a| format!("{} (+{})", a.date, a.excess()))
        .collect();
    format!("local history has more commits than GitLab on {}", dates.join(", "))
}

fn format_human(report: &RunReport) -> String {
    let mut lines = Vec::new();

    if report.commits_created == 0 {
        lines.push("Already up to date, no commits created.".to_string());
    } else {
        lines.push(format!(
            "Created {} commit(s) across {} day(s).",
            report.commits_created,
            report.deficits.len()
        ));
        for deficit in &report.deficits {
            lines.push(format!("  {}  +{}", deficit.date, deficit.count));
        }
    }

    lines.push(format!(
        "  {} event(s) fetched, {} counted",
        report.fetched_events, report.counted_events
    ));
    if report.rewritten {
        lines.push("  Committer dates rewritten.".to_string());
    }
    lines.push(if report.published {
        "  Pushed to remote.".to_string()
    } else {
        "  Push skipped.".to_string()
    });

    lines.join("\n")
}
