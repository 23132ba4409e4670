// Date histograms: count timestamped records per calendar date.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DateHistogram, Timestamped};

/// Time zone policy used to truncate a timestamp to a calendar date.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    /// The machine's local time zone.
    #[default]
    Local,
    Utc,
}

impl DateBucket {
    /// Calendar date of `timestamp` in this bucket's zone.
    pub fn date_of(self, timestamp: &DateTime<FixedOffset>) -> NaiveDate {
        match self {
            DateBucket::Local => timestamp.with_timezone(&Local).date_naive(),
            DateBucket::Utc => timestamp.with_timezone(&Utc).date_naive(),
        }
    }

    /// 12:00 on `date` in this bucket's zone.
    ///
    /// Synthesized commits are authored at noon so that `date_of` maps them
    /// back onto `date` regardless of the offset git records.
    pub fn noon_on(self, date: NaiveDate) -> DateTime<FixedOffset> {
        let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default());
        match self {
            DateBucket::Local => Local
                .from_local_datetime(&noon)
                .earliest()
                .map(|dt| dt.fixed_offset())
                .unwrap_or_else(|| Utc.from_utc_datetime(&noon).fixed_offset()),
            DateBucket::Utc => Utc.from_utc_datetime(&noon).fixed_offset(),
        }
    }
}

/// Count records per calendar date.
pub fn build_histogram<I>(records: I, bucket: DateBucket) -> DateHistogram
where
    I: IntoIterator,
    I::Item: Timestamped,
{
    let mut histogram = DateHistogram::new();
    for record in records {
        *histogram.entry(bucket.date_of(&record.timestamp())).or_insert(0) += 1;
    }
    histogram
}

/// Sum of all counts in a histogram.
pub fn total(histogram: &DateHistogram) -> u64 {
    histogram.values().map(|count| u64::from(*count)).sum()
}
