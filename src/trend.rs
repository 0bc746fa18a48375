//! Hourly request trend
//!
//! Buckets parsed records by the local hour of their timestamp. Timestamp
//! parsing here is strict, unlike the line grammar: a record whose
//! bracketed field does not parse is excluded from the trend (and tallied)
//! without touching any other aggregate.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use thiserror::Error;

use crate::parser::AccessRecord;

/// Timestamp layout of the combined format's bracketed field.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// A record timestamp the trend stage could not parse.
#[derive(Debug, Error)]
#[error("unparseable timestamp {raw:?}")]
pub struct TimestampError {
    /// The raw bracketed field from the log line
    pub raw: String,
    #[source]
    source: chrono::ParseError,
}

/// Parse a bracketed timestamp field, e.g. `07/Feb/2024:00:01:06 -0500`.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    DateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|source| TimestampError {
        raw: raw.to_string(),
        source,
    })
}

/// Truncate to the top of the hour, keeping the record's own UTC offset.
fn truncate_to_hour(ts: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Hour-bucketed request counts.
///
/// Buckets are ordered by instant, so logs that mix UTC offsets still
/// produce a single coherent timeline; two timestamps naming the same
/// instant in different offsets land in the same bucket.
#[derive(Debug, Default)]
pub struct TrendBuilder {
    buckets: BTreeMap<DateTime<FixedOffset>, u64>,
    excluded: u64,
}

impl TrendBuilder {
    /// Create an empty trend
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket one record by its local hour. A timestamp that fails the
    /// strict grammar only increments the excluded tally.
    pub fn observe(&mut self, record: &AccessRecord) {
        match parse_timestamp(&record.timestamp) {
            Ok(ts) => {
                *self.buckets.entry(truncate_to_hour(ts)).or_insert(0) += 1;
            }
            Err(err) => {
                tracing::debug!(error = %err, "record excluded from trend");
                self.excluded += 1;
            }
        }
    }

    /// Fold another trend into this one. Shared buckets sum; exclusion
    /// tallies add.
    pub fn merge(&mut self, other: TrendBuilder) {
        for (bucket, count) in other.buckets {
            *self.buckets.entry(bucket).or_insert(0) += count;
        }
        self.excluded += other.excluded;
    }

    /// Number of records excluded for unparseable timestamps
    pub fn excluded(&self) -> u64 {
        self.excluded
    }

    /// Whether no record has been bucketed yet
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Ordered (hour, count) pairs spanning the observed range. Hours with
    /// no requests between the first and last observed bucket appear with
    /// a zero count.
    pub fn hourly_series(&self) -> Vec<(DateTime<FixedOffset>, u64)> {
        let mut series = Vec::with_capacity(self.buckets.len());
        let mut previous: Option<DateTime<FixedOffset>> = None;
        for (&bucket, &count) in &self.buckets {
            if let Some(prev) = previous {
                let mut cursor = prev + Duration::hours(1);
                while cursor < bucket {
                    series.push((cursor, 0));
                    cursor += Duration::hours(1);
                }
            }
            series.push((bucket, count));
            previous = Some(bucket);
        }
        series
    }
}
