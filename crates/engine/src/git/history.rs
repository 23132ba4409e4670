// Local history reader: the commit log of the mirror repository.

use chrono::DateTime;
use thiserror::Error;

use backfill_common::types::CommitRecord;

use super::worker::{CommandExecutor, GitWorker, GitWorkerError, LOG_FIELD_SEPARATOR};

#[derive(Debug, Error)]
pub enum HistoryError {
    /// The current branch has no commits yet. Callers treat this as empty history.
    #[error("repository does not have any commits yet")]
    EmptyRepository,

    #[error(transparent)]
    Git(#[from] GitWorkerError),

    #[error("unreadable log line {line:?}: {reason}")]
    Parse { line: String, reason: String },
}

/// Commits of the current branch, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalHistory {
    pub commits: Vec<CommitRecord>,
}

impl LocalHistory {
    pub fn latest(&self) -> Option<&CommitRecord> {
        self.commits.first()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }
}

/// Read the commit log.
///
/// Returns `HistoryError::EmptyRepository` when HEAD is unborn; any other
/// failure is fatal.
pub fn read_history<E: CommandExecutor>(worker: &GitWorker<E>) -> Result<LocalHistory, HistoryError> {
    if worker.head()?.is_none() {
        return Err(HistoryError::EmptyRepository);
    }

    let output = worker.log()?;
    let commits = output
        .stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_log_line)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LocalHistory { commits })
}

/// Like `read_history`, but an empty repository yields empty history.
pub fn read_history_or_empty<E: CommandExecutor>(
    worker: &GitWorker<E>,
) -> Result<LocalHistory, HistoryError> {
    match read_history(worker) {
        Err(HistoryError::EmptyRepository) => Ok(LocalHistory::default()),
        other => other,
    }
}

fn parse_log_line(line: &str) -> Result<CommitRecord, HistoryError> {
    let mut fields = line.splitn(3, LOG_FIELD_SEPARATOR);
    let (Some(hash), Some(date)) = (fields.next(), fields.next()) else {
        return Err(HistoryError::Parse { line: line.to_string(), reason: "missing fields".into() });
    };
    let message = fields.next().unwrap_or_default();

    let date = DateTime::parse_from_rfc3339(date.trim()).map_err(|e| HistoryError::Parse {
        line: line.to_string(),
        reason: format!("bad author date: {e}"),
    })?;

    Ok(CommitRecord { hash: hash.trim().to_string(), date, message: message.to_string() })
}
