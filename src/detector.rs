//! Anomaly detection over the aggregated origin table
//!
//! Two detectors run after ingestion: a brute-force candidate scan over
//! failed-auth counters and a request-volume outlier scan. Both are pure
//! functions of the table and report in deterministic order.

use std::cmp::Ordering;

use crate::stats::OriginTable;

/// An origin whose failed-auth count exceeded the threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BruteForceFinding {
    pub origin: String,
    /// Requests answered with 401 or 403
    pub failed_auth: u64,
    /// Total requests from this origin
    pub requests: u64,
}

/// An origin paired with its request volume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginVolume {
    pub origin: String,
    pub requests: u64,
}

/// Volume outlier scan results
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    /// Origins ranked by request count descending, ties in first-seen
    /// order, truncated to the configured ranking size
    pub top: Vec<OriginVolume>,
    /// Origins whose request count is strictly below the 10th-percentile
    /// cutoff. May overlap `top` when few origins exist.
    pub low: Vec<OriginVolume>,
    /// The interpolated cutoff itself, `None` for an empty table
    pub low_cutoff: Option<f64>,
}

/// Scan for origins whose failed-auth count strictly exceeds `threshold`.
///
/// An origin with exactly `threshold` failures is not flagged. Findings
/// come back in first-seen order.
pub fn detect_brute_force(table: &OriginTable, threshold: u64) -> Vec<BruteForceFinding> {
    table
        .iter()
        .filter(|(_, stats)| stats.failed_auth > threshold)
        .map(|(origin, stats)| BruteForceFinding {
            origin: origin.to_string(),
            failed_auth: stats.failed_auth,
            requests: stats.requests,
        })
        .collect()
}

/// Rank origins by request volume and flag the unusually quiet ones.
///
/// The low set collects origins strictly below the 10th percentile of all
/// per-origin request counts. With few origins the cutoff sits near the
/// minimum and the low set is often empty; that is expected, not a bug.
pub fn detect_outliers(table: &OriginTable, top_n: usize) -> OutlierReport {
    let mut ranked: Vec<OriginVolume> = table
        .iter()
        .map(|(origin, stats)| OriginVolume {
            origin: origin.to_string(),
            requests: stats.requests,
        })
        .collect();
    // Stable sort keeps first-seen order within equal counts.
    ranked.sort_by(|a, b| b.requests.cmp(&a.requests));

    let mut counts: Vec<f64> = table.iter().map(|(_, stats)| stats.requests as f64).collect();
    counts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let low_cutoff = if counts.is_empty() {
        None
    } else {
        Some(quantile(&counts, 0.1))
    };

    let low = match low_cutoff {
        Some(cutoff) => table
            .iter()
            .filter(|(_, stats)| (stats.requests as f64) < cutoff)
            .map(|(origin, stats)| OriginVolume {
                origin: origin.to_string(),
                requests: stats.requests,
            })
            .collect(),
        None => Vec::new(),
    };

    let top: Vec<OriginVolume> = ranked.into_iter().take(top_n).collect();

    OutlierReport { top, low, low_cutoff }
}

/// Quantile by linear interpolation between the two nearest order
/// statistics. `sorted` must be ascending; `q` in [0, 1].
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let index = q * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = index - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}
