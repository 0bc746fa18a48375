//! JSON output format for analysis reports
//!
//! A versioned envelope so downstream consumers can detect layout changes.
//! Optional sections are omitted rather than serialized as null.

use serde::{Deserialize, Serialize};

use crate::analyzer::Analysis;

/// Line accounting for the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_lines: u64,
    pub parsed_records: u64,
    pub malformed_lines: u64,
    pub blank_lines: u64,
    /// Distinct origins seen across all parsed records
    pub distinct_origins: usize,
}

/// One brute-force candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBruteForceOrigin {
    pub origin: String,
    pub failed_auth: u64,
    pub requests: u64,
}

/// Brute-force scan section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonBruteForce {
    /// Threshold the scan ran with; origins above it are listed
    pub threshold: u64,
    pub origins: Vec<JsonBruteForceOrigin>,
}

/// An origin and its request volume
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOriginVolume {
    pub origin: String,
    pub requests: u64,
}

/// Volume outlier section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutliers {
    pub top_n: usize,
    /// 10th-percentile request count; absent for an empty table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_cutoff: Option<f64>,
    pub top: Vec<JsonOriginVolume>,
    pub low: Vec<JsonOriginVolume>,
}

/// One hour bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTrendBucket {
    /// RFC 3339 hour start in the records' own UTC offset
    pub bucket: String,
    pub requests: u64,
}

/// Hourly trend section (present only when requested)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonTrend {
    /// Records excluded for unparseable timestamps
    pub excluded_records: u64,
    pub buckets: Vec<JsonTrendBucket>,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    /// Crate version that produced the report
    pub version: String,
    /// Format name identifier
    pub format: String,
    pub summary: JsonSummary,
    pub brute_force: JsonBruteForce,
    pub outliers: JsonOutliers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<JsonTrend>,
}

impl JsonReport {
    /// Build the envelope from a finished analysis.
    pub fn from_analysis(analysis: &Analysis, threshold: u64, top_n: usize) -> Self {
        let origins = analysis
            .brute_force
            .iter()
            .map(|finding| JsonBruteForceOrigin {
                origin: finding.origin.clone(),
                failed_auth: finding.failed_auth,
                requests: finding.requests,
            })
            .collect();

        let volume = |volumes: &[crate::detector::OriginVolume]| {
            volumes
                .iter()
                .map(|v| JsonOriginVolume {
                    origin: v.origin.clone(),
                    requests: v.requests,
                })
                .collect::<Vec<_>>()
        };

        let trend = analysis.trend.as_ref().map(|trend| JsonTrend {
            excluded_records: trend.excluded(),
            buckets: trend
                .hourly_series()
                .into_iter()
                .map(|(bucket, requests)| JsonTrendBucket {
                    bucket: bucket.to_rfc3339(),
                    requests,
                })
                .collect(),
        });

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "sereno-json-v1".to_string(),
            summary: JsonSummary {
                total_lines: analysis.summary.total_lines,
                parsed_records: analysis.summary.parsed_records,
                malformed_lines: analysis.summary.malformed_lines,
                blank_lines: analysis.summary.blank_lines,
                distinct_origins: analysis.table.len(),
            },
            brute_force: JsonBruteForce {
                threshold,
                origins,
            },
            outliers: JsonOutliers {
                top_n,
                low_cutoff: analysis.outliers.low_cutoff,
                top: volume(&analysis.outliers.top),
                low: volume(&analysis.outliers.low),
            },
            trend,
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
