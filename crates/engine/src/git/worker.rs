use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, FixedOffset};
use tracing::debug;

/// Field separator for `git log` output (ASCII unit separator).
pub const LOG_FIELD_SEPARATOR: char = '\u{1f}';

/// `--format` string producing `hash␟author-date␟subject` per line.
pub const LOG_FORMAT: &str = "--format=%H%x1f%aI%x1f%s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitWorkerError {
    SpawnFailed { command: String, message: String },
    CommandFailed { command: String, code: Option<i32>, stderr: String },
}

impl Display for GitWorkerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GitWorkerError::SpawnFailed { command, message } => {
                write!(f, "failed to run `{command}`: {message}")
            }
            GitWorkerError::CommandFailed { command, code, stderr } => {
                write!(f, "`{command}` failed with code {:?}: {}", code, stderr.trim())
            }
        }
    }
}

impl Error for GitWorkerError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandExecutor: Send + Sync {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        // Never block on an editor or credential prompt.
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .env("GIT_EDITOR", "true")
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Range of commits to rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebaseRange {
    /// Every commit reachable from HEAD.
    Root,
    /// Commits after `upstream`, exclusive.
    After(String),
}

#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: E,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self { repo_path: repo_path.into(), executor: ProcessCommandExecutor }
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), executor }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Hash of the commit HEAD points at, or `None` when the current branch
    /// has no commits yet.
    pub fn head(&self) -> Result<Option<String>, GitWorkerError> {
        let args = strings(&["rev-parse", "--verify", "--quiet", "HEAD"]);
        let command = format!("git {}", args.join(" "));
        let result = self.execute(&command, &args)?;

        let hash = result.stdout.trim();
        if result.success && !hash.is_empty() {
            return Ok(Some(hash.to_string()));
        }
        // `--quiet` exits 1 without output when HEAD is unborn.
        if result.code == Some(1) && hash.is_empty() && result.stderr.trim().is_empty() {
            return Ok(None);
        }

        Err(GitWorkerError::CommandFailed { command, code: result.code, stderr: result.stderr })
    }

    /// Full log of HEAD, newest first, one `LOG_FORMAT` line per commit.
    pub fn log(&self) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(strings(&["log", LOG_FORMAT]))
    }

    /// Record an empty commit authored at `date`.
    pub fn commit_empty(
        &self,
        message: &str,
        date: &DateTime<FixedOffset>,
    ) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(vec![
            "commit".to_string(),
            "--allow-empty".to_string(),
            "--no-verify".to_string(),
            "--date".to_string(),
            git_date(date),
            "-m".to_string(),
            message.to_string(),
        ])
    }

    /// Replay `range` onto itself so every committer date equals its author date.
    pub fn rebase_committer_dates(
        &self,
        range: &RebaseRange,
    ) -> Result<GitCommandOutput, GitWorkerError> {
        let mut args = strings(&["rebase", "--committer-date-is-author-date", "--force-rebase"]);
        match range {
            RebaseRange::Root => args.push("--root".to_string()),
            RebaseRange::After(upstream) => args.push(upstream.clone()),
        }
        self.run(args)
    }

    /// Overwrite `remote`'s `branch` with HEAD.
    pub fn push_force(&self, remote: &str, branch: &str) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(vec![
            "push".to_string(),
            "--force".to_string(),
            remote.to_string(),
            format!("HEAD:refs/heads/{branch}"),
        ])
    }

    fn run(&self, args: Vec<String>) -> Result<GitCommandOutput, GitWorkerError> {
        let command = format!("git {}", args.join(" "));
        let result = self.execute(&command, &args)?;

        if result.success {
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };

        Err(GitWorkerError::CommandFailed { command, code: result.code, stderr })
    }

    fn execute(&self, command: &str, args: &[String]) -> Result<CommandResult, GitWorkerError> {
        debug!(%command, repo = %self.repo_path.display(), "running git");
        self.executor.execute("git", args, &self.repo_path).map_err(|error| {
            GitWorkerError::SpawnFailed { command: command.to_string(), message: error.to_string() }
        })
    }
}

/// Date in the `YYYY-MM-DD HH:MM:SS +ZZZZ` form git parses unambiguously.
pub fn git_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%Y-%m-%d %H:%M:%S %z").to_string()
}

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}
