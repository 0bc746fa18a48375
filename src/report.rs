//! Human-readable report rendering
//!
//! The findings tables go to stdout; the one-line ingest accounting note
//! goes to stderr so piped output stays clean.

use crate::analyzer::{Analysis, AnalyzerConfig, IngestSummary};

/// Print the ingest accounting note to stderr.
pub fn print_ingest_summary(summary: &IngestSummary, trend_excluded: Option<u64>) {
    eprintln!(
        "[sereno: {} lines read: {} parsed, {} malformed, {} blank]",
        summary.total_lines, summary.parsed_records, summary.malformed_lines, summary.blank_lines
    );
    if let Some(excluded) = trend_excluded {
        if excluded > 0 {
            eprintln!("[sereno: {excluded} records excluded from trend: unparseable timestamp]");
        }
    }
}

/// Print the findings tables to stdout.
pub fn print_report(analysis: &Analysis, config: &AnalyzerConfig) {
    println!(
        "=== Brute-Force Candidates (failed auth > {}) ===",
        config.threshold
    );
    if analysis.brute_force.is_empty() {
        println!("No origins exceeded the failed-auth threshold.");
    } else {
        println!("{:<24} {:>10} {:>12}", "origin", "requests", "failed auth");
        for finding in &analysis.brute_force {
            println!(
                "{:<24} {:>10} {:>12}",
                finding.origin, finding.requests, finding.failed_auth
            );
        }
    }

    println!();
    println!(
        "=== Top Origins by Request Count (top {}) ===",
        config.top_n
    );
    if analysis.outliers.top.is_empty() {
        println!("No requests parsed.");
    } else {
        println!("{:>4}  {:<24} {:>10}", "rank", "origin", "requests");
        for (rank, volume) in analysis.outliers.top.iter().enumerate() {
            println!(
                "{:>4}  {:<24} {:>10}",
                rank + 1,
                volume.origin,
                volume.requests
            );
        }
    }

    println!();
    match analysis.outliers.low_cutoff {
        Some(cutoff) if !analysis.outliers.low.is_empty() => {
            println!("=== Low-Volume Origins (below P10 = {cutoff:.2}) ===");
            println!("{:<24} {:>10}", "origin", "requests");
            for volume in &analysis.outliers.low {
                println!("{:<24} {:>10}", volume.origin, volume.requests);
            }
        }
        Some(cutoff) => {
            println!("=== Low-Volume Origins ===");
            println!("No origins below the 10th percentile ({cutoff:.2}).");
        }
        None => {
            println!("=== Low-Volume Origins ===");
            println!("No origins observed.");
        }
    }

    if let Some(trend) = &analysis.trend {
        println!();
        println!("=== Requests per Hour ===");
        if trend.is_empty() {
            println!("No records carried a parseable timestamp.");
        } else {
            for (bucket, count) in trend.hourly_series() {
                println!("{}  {:>8}", bucket.format("%Y-%m-%d %H:00 %z"), count);
            }
        }
    }
}
