// History rewriter/publisher: normalize committer dates, then force-push.

use tracing::info;

use super::worker::{CommandExecutor, GitWorker, GitWorkerError, RebaseRange};

/// What the terminal step actually did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub rewritten: bool,
    pub published: bool,
}

/// Where to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget<'a> {
    pub remote: &'a str,
    pub branch: &'a str,
    /// Skip the push; only rewrite.
    pub skip_push: bool,
}

/// Rewrite committer dates of everything after `previous_latest` (or the
/// whole history when there was none) and force-push the branch.
///
/// Nothing happens when the repository is still empty. The rewrite is
/// skipped when no commits were created, since the range is empty.
pub fn rewrite_and_publish<E: CommandExecutor>(
    worker: &GitWorker<E>,
    previous_latest: Option<&str>,
    commits_created: u64,
    target: &PublishTarget<'_>,
) -> Result<PublishOutcome, GitWorkerError> {
    let mut outcome = PublishOutcome::default();

    if previous_latest.is_none() && commits_created == 0 {
        info!("repository is still empty, nothing to rewrite or publish");
        return Ok(outcome);
    }

    if commits_created > 0 {
        let range = match previous_latest {
            Some(hash) => RebaseRange::After(hash.to_string()),
            None => RebaseRange::Root,
        };
        info!(?range, "Rebasing commit dates... (run git status in the repo to see progress)");
        worker.rebase_committer_dates(&range)?;
        outcome.rewritten = true;
    }

    if target.skip_push {
        info!("push skipped");
        return Ok(outcome);
    }

    info!(remote = target.remote, branch = target.branch, "Pushing...");
    worker.push_force(target.remote, target.branch)?;
    outcome.published = true;

    Ok(outcome)
}
