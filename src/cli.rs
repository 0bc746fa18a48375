//! CLI argument parsing for Sereno

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for analysis reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "sereno")]
#[command(version)]
#[command(about = "Access log analyzer: brute-force and traffic anomaly detection", long_about = None)]
pub struct Cli {
    /// Access log file in combined format
    #[arg(value_name = "LOG_FILE")]
    pub log_file: PathBuf,

    /// Flag origins with more than this many failed-auth responses (401/403)
    #[arg(
        short = 't',
        long = "threshold",
        value_name = "COUNT",
        default_value = "10"
    )]
    pub threshold: u64,

    /// Number of origins to show in the request volume ranking
    #[arg(short = 'n', long = "top-n", value_name = "COUNT", default_value = "10")]
    pub top_n: usize,

    /// Include the hourly request trend
    #[arg(long = "trend")]
    pub trend: bool,

    /// Output format (text, json, or csv)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Worker threads for ingestion (1 = sequential)
    #[arg(short = 'j', long = "jobs", value_name = "N", default_value = "1")]
    pub jobs: usize,

    /// Enable verbose per-line diagnostics on stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
