// Commit synthesizer: fill deficits with empty, dated commits.

use chrono::NaiveDate;
use tracing::info;

use backfill_common::histogram::DateBucket;
use backfill_common::reconcile::Deficit;

use super::worker::{CommandExecutor, GitWorker, GitWorkerError};

/// Message of a synthesized commit.
pub fn commit_message(date: NaiveDate) -> String {
    format!("Commit for {}", date.format("%Y-%m-%d"))
}

/// Create `deficit.count` empty commits for each deficit, in ascending date
/// order, authored at noon of the date in `bucket`'s zone.
///
/// Returns the number of commits created. Stops at the first failure; commits
/// already created stay in place.
pub fn synthesize<E: CommandExecutor>(
    worker: &GitWorker<E>,
    deficits: &[Deficit],
    bucket: DateBucket,
) -> Result<u64, GitWorkerError> {
    let mut ordered = deficits.to_vec();
    ordered.sort_by_key(|deficit| deficit.date);

    let mut created = 0u64;
    for deficit in ordered {
        info!(
            date = %deficit.date,
            count = deficit.count,
            "> Creating {} commit{} for {}",
            deficit.count,
            if deficit.count == 1 { "" } else { "s" },
            deficit.date
        );
        let message = commit_message(deficit.date);
        let authored = bucket.noon_on(deficit.date);
        for _ in 0..deficit.count {
            worker.commit_empty(&message, &authored)?;
            created += 1;
        }
    }

    Ok(created)
}
