// Remote activity classification.

use crate::types::RemoteEvent;

/// `action_name` GitLab reports for a push.
pub const PUSH_ACTION: &str = "pushed to";

/// A push that carried exactly one commit.
///
/// Multi-commit pushes (rebases, merges, squashes) cannot be mapped onto the
/// one-commit-per-event model and are ignored.
pub fn is_single_commit_push(event: &RemoteEvent) -> bool {
    event.action_name == PUSH_ACTION
        && event.push_data.as_ref().is_some_and(|push| push.commit_count == 1)
}

/// Keep only single-commit pushes, preserving feed order.
pub fn single_commit_pushes(events: Vec<RemoteEvent>) -> Vec<RemoteEvent> {
    events.into_iter().filter(is_single_commit_push).collect()
}
