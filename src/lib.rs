//! Sereno - streaming access log analyzer
//!
//! This library provides the core functionality for analyzing web server
//! access logs in combined format: single-pass ingestion, per-origin
//! aggregation, brute-force and volume outlier detection, and hourly
//! request trend reporting.

pub mod analyzer;
pub mod cli;
pub mod csv_output;
pub mod detector;
pub mod json_output;
pub mod parser;
pub mod report;
pub mod stats;
pub mod trend;
