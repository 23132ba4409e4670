// CLI subcommand dispatch.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};
use tracing::debug;

use backfill_engine::config::Config;

pub mod plan;
pub mod sync;

#[derive(Subcommand)]
pub enum Command {
    /// Create the missing commits, rewrite their dates, and force-push
    Sync(sync::SyncArgs),
    /// Show missing commits and anomalies without touching the repository
    Plan(plan::PlanArgs),
}

pub fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Sync(args) => sync::run(args),
        Command::Plan(args) => plan::run(args),
    }
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Config file (defaults to ./backfill.toml, then ~/.backfill/config.toml).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Local mirror repository.
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long)]
    pub json: bool,
}

impl CommonArgs {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let mut config =
            Config::load(self.config.as_deref()).context("failed to load configuration")?;
        if let Some(repo) = &self.repo {
            config.repo.path = repo.clone();
        }
        debug!(
            api_url = %config.gitlab.api_url,
            user_id = %config.gitlab.user_id,
            repo = %config.repo.path.display(),
            bucket = ?config.reconcile.date_bucket,
            "configuration loaded"
        );
        Ok(config)
    }
}

/// Run `future` to completion on a current-thread runtime.
pub fn block_on<F: std::future::Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
