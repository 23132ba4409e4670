// Core domain types shared across all backfill crates.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar date → number of events on that date. Iterates in ascending date order.
pub type DateHistogram = BTreeMap<NaiveDate, u32>;

/// A commit read from the local repository log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRecord {
    pub hash: String,
    /// Author date, with the offset it was recorded in.
    pub date: DateTime<FixedOffset>,
    pub message: String,
}

/// An entry of the remote user activity feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEvent {
    pub created_at: DateTime<FixedOffset>,
    pub action_name: String,
    /// Present only for push events.
    #[serde(default)]
    pub push_data: Option<PushData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PushData {
    pub commit_count: u64,
}

/// Anything that can be placed on the calendar.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<FixedOffset>;
}

impl Timestamped for CommitRecord {
    fn timestamp(&self) -> DateTime<FixedOffset> {
        self.date
    }
}

impl Timestamped for RemoteEvent {
    fn timestamp(&self) -> DateTime<FixedOffset> {
        self.created_at
    }
}

impl<T: Timestamped> Timestamped for &T {
    fn timestamp(&self) -> DateTime<FixedOffset> {
        (*self).timestamp()
    }
}
