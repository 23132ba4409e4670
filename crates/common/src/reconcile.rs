// Reconciler: diff the local and remote histograms into per-date deficits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::DateHistogram;

/// Commits to synthesize on one date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deficit {
    pub date: NaiveDate,
    /// Always at least 1.
    pub count: u32,
}

/// A date where the local repository already has more commits than the remote reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub local: u32,
    pub remote: u32,
}

impl Anomaly {
    pub fn excess(&self) -> u32 {
        self.local.saturating_sub(self.remote)
    }
}

/// Outcome of diffing the two histograms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Ascending by date.
    pub deficits: Vec<Deficit>,
    /// Ascending by date. Reported, never acted on.
    pub anomalies: Vec<Anomaly>,
}

impl ReconcilePlan {
    pub fn total_commits(&self) -> u64 {
        self.deficits.iter().map(|d| u64::from(d.count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.deficits.is_empty()
    }
}

/// Compute the deficit for every date present in `remote`.
///
/// Dates only present locally are ignored. Dates where local exceeds remote
/// become anomalies; dates where the counts match produce nothing.
pub fn reconcile(local: &DateHistogram, remote: &DateHistogram) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for (date, remote_count) in remote {
        let local_count = local.get(date).copied().unwrap_or(0);
        if local_count > *remote_count {
            plan.anomalies.push(Anomaly { date: *date, local: local_count, remote: *remote_count });
        } else if local_count < *remote_count {
            plan.deficits.push(Deficit { date: *date, count: remote_count - local_count });
        }
    }

    plan
}
