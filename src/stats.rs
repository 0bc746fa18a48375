//! Per-origin request aggregation

use std::collections::HashMap;

use crate::parser::AccessRecord;

/// Counters for a single origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OriginStats {
    /// Number of parsed records attributed to this origin
    pub requests: u64,
    /// Number of those records with a failed-auth status (401 or 403)
    pub failed_auth: u64,
}

/// Aggregated counters for every origin seen in one run.
///
/// Origins are enumerated in first-seen order, which makes report output
/// and ranking tie-breaks deterministic for a given input.
#[derive(Debug, Default, PartialEq)]
pub struct OriginTable {
    /// Map from origin address to its counters
    stats: HashMap<String, OriginStats>,
    /// Origins in the order they were first observed
    order: Vec<String>,
}

impl OriginTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the table, creating the origin entry on first
    /// sight.
    pub fn ingest(&mut self, record: &AccessRecord) {
        if !self.stats.contains_key(&record.origin) {
            self.order.push(record.origin.clone());
        }
        let entry = self.stats.entry(record.origin.clone()).or_default();
        entry.requests += 1;
        if record.is_auth_failure() {
            entry.failed_auth += 1;
        }
    }

    /// Fold another table into this one. Counters for shared origins are
    /// summed; origins unique to `other` are appended in `other`'s order.
    /// Merging tables built from contiguous input partitions, in partition
    /// order, reproduces the table a sequential pass would have built.
    pub fn merge(&mut self, other: OriginTable) {
        let OriginTable {
            stats: mut other_stats,
            order: other_order,
        } = other;
        for origin in other_order {
            if let Some(rhs) = other_stats.remove(&origin) {
                if !self.stats.contains_key(&origin) {
                    self.order.push(origin.clone());
                }
                let entry = self.stats.entry(origin).or_default();
                entry.requests += rhs.requests;
                entry.failed_auth += rhs.failed_auth;
            }
        }
    }

    /// Look up one origin's counters
    pub fn get(&self, origin: &str) -> Option<&OriginStats> {
        self.stats.get(origin)
    }

    /// Number of distinct origins
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no origins have been seen
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate origins and their counters in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OriginStats)> + '_ {
        self.order
            .iter()
            .filter_map(|origin| self.stats.get(origin).map(|stats| (origin.as_str(), stats)))
    }
}
