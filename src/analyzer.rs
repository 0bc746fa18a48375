//! Analysis driver
//!
//! Owns the streaming pass over the log file: reads lines, applies the
//! skip-and-continue policy for malformed input, feeds the aggregates,
//! and runs the detectors over the merged result. I/O failures opening
//! or reading the file are the only fatal errors.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use anyhow::{Context, Result};

use crate::detector::{self, BruteForceFinding, OutlierReport};
use crate::parser;
use crate::stats::OriginTable;
use crate::trend::TrendBuilder;

/// Knobs for one analysis run
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Failed-auth count above which an origin is flagged
    pub threshold: u64,
    /// Ranking size for the volume outlier report
    pub top_n: usize,
    /// Build the hourly trend
    pub trend: bool,
    /// Worker threads for ingestion; 1 means a plain sequential pass
    pub jobs: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            top_n: 10,
            trend: false,
            jobs: 1,
        }
    }
}

/// Line accounting for one run. An empty input is a valid run with every
/// counter at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Lines read, including blank and malformed ones
    pub total_lines: u64,
    /// Lines that parsed into records
    pub parsed_records: u64,
    /// Non-blank lines rejected by the grammar
    pub malformed_lines: u64,
    /// Whitespace-only lines
    pub blank_lines: u64,
}

impl IngestSummary {
    /// Add another partition's accounting to this one
    pub fn merge(&mut self, other: IngestSummary) {
        self.total_lines += other.total_lines;
        self.parsed_records += other.parsed_records;
        self.malformed_lines += other.malformed_lines;
        self.blank_lines += other.blank_lines;
    }
}

/// Everything one run produces
#[derive(Debug)]
pub struct Analysis {
    pub summary: IngestSummary,
    pub table: OriginTable,
    pub brute_force: Vec<BruteForceFinding>,
    pub outliers: OutlierReport,
    /// Present only when the run was configured with `trend`
    pub trend: Option<TrendBuilder>,
}

/// Per-partition accumulator. The sequential path uses a single one; the
/// parallel path builds one per worker and merges them in partition order,
/// which reproduces the sequential first-seen order.
#[derive(Debug, Default)]
struct Partition {
    summary: IngestSummary,
    table: OriginTable,
    trend: Option<TrendBuilder>,
}

impl Partition {
    fn new(trend: bool) -> Self {
        Self {
            summary: IngestSummary::default(),
            table: OriginTable::new(),
            trend: trend.then(TrendBuilder::new),
        }
    }

    fn ingest_line(&mut self, line: &str) {
        self.summary.total_lines += 1;
        if line.trim().is_empty() {
            self.summary.blank_lines += 1;
            return;
        }
        match parser::parse_line(line) {
            Ok(record) => {
                self.summary.parsed_records += 1;
                self.table.ingest(&record);
                if let Some(trend) = self.trend.as_mut() {
                    trend.observe(&record);
                }
            }
            Err(err) => {
                self.summary.malformed_lines += 1;
                tracing::debug!(line = err.line(), "skipped malformed line");
            }
        }
    }

    fn merge(&mut self, other: Partition) {
        self.summary.merge(other.summary);
        self.table.merge(other.table);
        match (self.trend.as_mut(), other.trend) {
            (Some(mine), Some(theirs)) => mine.merge(theirs),
            (None, Some(theirs)) => self.trend = Some(theirs),
            _ => {}
        }
    }
}

/// Run the full analysis over the log file at `path`.
pub fn run(path: &Path, config: &AnalyzerConfig) -> Result<Analysis> {
    let partition = if config.jobs > 1 {
        ingest_parallel(path, config)?
    } else {
        ingest_sequential(path, config)?
    };

    let Partition {
        summary,
        table,
        trend,
    } = partition;

    tracing::debug!(
        total = summary.total_lines,
        parsed = summary.parsed_records,
        malformed = summary.malformed_lines,
        "ingestion complete"
    );

    let brute_force = detector::detect_brute_force(&table, config.threshold);
    let outliers = detector::detect_outliers(&table, config.top_n);

    Ok(Analysis {
        summary,
        table,
        brute_force,
        outliers,
        trend,
    })
}

fn open_log(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("failed to open log file {}", path.display()))
}

fn ingest_sequential(path: &Path, config: &AnalyzerConfig) -> Result<Partition> {
    let mut reader = BufReader::new(open_log(path)?);
    let mut partition = Partition::new(config.trend);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .context("failed to read log line")?;
        if n == 0 {
            break;
        }
        // Lossy conversion keeps the pass alive on invalid UTF-8; such
        // lines fall through to the grammar and are counted malformed.
        let line = String::from_utf8_lossy(&buf);
        partition.ingest_line(line.trim_end_matches(['\r', '\n']));
    }
    Ok(partition)
}

/// Nominal byte range owned by one ingestion worker.
///
/// Worker zero owns lines starting in `[0, end]`; every other worker owns
/// lines starting in `(start, end]`. A worker reads past `end` to finish
/// the line that straddles it, and the next worker discards everything up
/// to its first newline, so every line is processed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ByteRange {
    start: u64,
    end: u64,
}

fn byte_ranges(len: u64, jobs: usize) -> Vec<ByteRange> {
    if len == 0 {
        return vec![ByteRange { start: 0, end: 0 }];
    }
    let jobs = (jobs.max(1) as u64).min(len);
    let chunk = len.div_ceil(jobs);
    (0..jobs)
        .map(|i| ByteRange {
            start: i * chunk,
            end: ((i + 1) * chunk).min(len),
        })
        .filter(|range| range.start < range.end)
        .collect()
}

fn ingest_range(path: &Path, range: ByteRange, trend: bool) -> Result<Partition> {
    let mut reader = BufReader::new(open_log(path)?);
    reader
        .seek(SeekFrom::Start(range.start))
        .context("failed to seek to partition start")?;

    let mut partition = Partition::new(trend);
    let mut pos = range.start;
    let mut buf = Vec::new();

    if range.start > 0 {
        // The tail of the previous worker's straddling line.
        let skipped = reader
            .read_until(b'\n', &mut buf)
            .context("failed to align partition start")?;
        if skipped == 0 {
            return Ok(partition);
        }
        pos += skipped as u64;
    }

    while pos <= range.end {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .context("failed to read log line")?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        partition.ingest_line(line.trim_end_matches(['\r', '\n']));
        pos += n as u64;
    }
    Ok(partition)
}

fn ingest_parallel(path: &Path, config: &AnalyzerConfig) -> Result<Partition> {
    let len = open_log(path)?
        .metadata()
        .context("failed to stat log file")?
        .len();
    let ranges = byte_ranges(len, config.jobs);
    let trend = config.trend;

    let partitions = crossbeam::scope(|scope| {
        let handles: Vec<_> = ranges
            .iter()
            .map(|&range| scope.spawn(move |_| ingest_range(path, range, trend)))
            .collect();
        handles
            .into_iter()
            .map(|handle| match handle.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("ingestion worker panicked")),
            })
            .collect::<Result<Vec<Partition>>>()
    })
    .map_err(|_| anyhow::anyhow!("ingestion worker panicked"))??;

    let mut merged = Partition::new(config.trend);
    for partition in partitions {
        merged.merge(partition);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn log_line(origin: &str, status: u16) -> String {
        format!(r#"{origin} - - [07/Feb/2024:10:15:32 -0500] "GET / HTTP/1.1" {status} 512 "-" "test""#)
    }

    fn write_log(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_ingest_line_classification() {
        let mut partition = Partition::new(false);
        partition.ingest_line(&log_line("10.0.0.1", 200));
        partition.ingest_line("");
        partition.ingest_line("   ");
        partition.ingest_line("not an access log line");

        assert_eq!(partition.summary.total_lines, 4);
        assert_eq!(partition.summary.parsed_records, 1);
        assert_eq!(partition.summary.blank_lines, 2);
        assert_eq!(partition.summary.malformed_lines, 1);
    }

    #[test]
    fn test_malformed_lines_do_not_touch_table() {
        let mut partition = Partition::new(false);
        partition.ingest_line(&log_line("10.0.0.1", 200));
        partition.ingest_line("garbage");
        partition.ingest_line(&log_line("10.0.0.1", 200));

        assert_eq!(partition.table.get("10.0.0.1").unwrap().requests, 2);
        assert_eq!(partition.table.len(), 1);
    }

    #[test]
    fn test_run_over_mixed_file() {
        let lines = vec![
            log_line("10.0.0.1", 401),
            "### corrupted ###".to_string(),
            log_line("10.0.0.2", 200),
            String::new(),
            log_line("10.0.0.1", 200),
            log_line("10.0.0.3", 403),
        ];
        let file = write_log(&lines);

        let analysis = run(file.path(), &AnalyzerConfig::default()).unwrap();
        assert_eq!(analysis.summary.total_lines, 6);
        assert_eq!(analysis.summary.parsed_records, 4);
        assert_eq!(analysis.summary.malformed_lines, 1);
        assert_eq!(analysis.summary.blank_lines, 1);
        assert_eq!(analysis.table.len(), 3);
        assert_eq!(analysis.table.get("10.0.0.1").unwrap().failed_auth, 1);
    }

    #[test]
    fn test_run_missing_file_is_fatal() {
        let err = run(Path::new("/nonexistent/access.log"), &AnalyzerConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("failed to open log file"));
    }

    #[test]
    fn test_run_empty_file_is_valid() {
        let file = write_log(&[]);
        let analysis = run(file.path(), &AnalyzerConfig::default()).unwrap();
        assert_eq!(analysis.summary, IngestSummary::default());
        assert!(analysis.table.is_empty());
        assert!(analysis.brute_force.is_empty());
        assert!(analysis.outliers.top.is_empty());
    }

    #[test]
    fn test_trend_built_only_when_requested() {
        let file = write_log(&[log_line("10.0.0.1", 200)]);

        let without = run(file.path(), &AnalyzerConfig::default()).unwrap();
        assert!(without.trend.is_none());

        let config = AnalyzerConfig {
            trend: true,
            ..Default::default()
        };
        let with = run(file.path(), &config).unwrap();
        assert_eq!(with.trend.unwrap().hourly_series().len(), 1);
    }

    #[test]
    fn test_byte_ranges_cover_input_contiguously() {
        for (len, jobs) in [(100u64, 4usize), (10, 3), (7, 7), (1, 5), (1000, 1)] {
            let ranges = byte_ranges(len, jobs);
            assert_eq!(ranges[0].start, 0, "len {len} jobs {jobs}");
            assert_eq!(ranges.last().unwrap().end, len);
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn test_byte_ranges_empty_input() {
        assert_eq!(byte_ranges(0, 4), vec![ByteRange { start: 0, end: 0 }]);
    }

    #[test]
    fn test_byte_ranges_never_exceed_worker_count() {
        assert!(byte_ranges(1000, 4).len() <= 4);
        // More workers than bytes collapses to at most one per byte.
        assert!(byte_ranges(3, 16).len() <= 3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut lines = Vec::new();
        for i in 0..50 {
            lines.push(log_line(&format!("10.0.0.{}", i % 7), if i % 5 == 0 { 401 } else { 200 }));
            if i % 11 == 0 {
                lines.push("malformed line here".to_string());
            }
        }
        let file = write_log(&lines);

        let sequential = run(file.path(), &AnalyzerConfig::default()).unwrap();
        for jobs in [2, 3, 8] {
            let config = AnalyzerConfig {
                jobs,
                ..Default::default()
            };
            let parallel = run(file.path(), &config).unwrap();
            assert_eq!(parallel.summary, sequential.summary, "jobs {jobs}");
            assert_eq!(parallel.table, sequential.table, "jobs {jobs}");
            assert_eq!(parallel.outliers, sequential.outliers, "jobs {jobs}");
        }
    }

    #[test]
    fn test_parallel_with_trend_matches_sequential() {
        let lines: Vec<String> = (0..30)
            .map(|i| {
                format!(
                    r#"10.0.0.{} - - [07/Feb/2024:{:02}:15:32 -0500] "GET / HTTP/1.1" 200 512 "-" "test""#,
                    i % 3,
                    i % 24
                )
            })
            .collect();
        let file = write_log(&lines);

        let config = |jobs| AnalyzerConfig {
            trend: true,
            jobs,
            ..Default::default()
        };
        let sequential = run(file.path(), &config(1)).unwrap();
        let parallel = run(file.path(), &config(4)).unwrap();
        assert_eq!(
            parallel.trend.unwrap().hourly_series(),
            sequential.trend.unwrap().hourly_series()
        );
    }

    #[test]
    fn test_file_without_trailing_newline() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}\n{}", log_line("10.0.0.1", 200), log_line("10.0.0.2", 200)).unwrap();
        file.flush().unwrap();

        let analysis = run(file.path(), &AnalyzerConfig::default()).unwrap();
        assert_eq!(analysis.summary.parsed_records, 2);
        assert_eq!(analysis.table.len(), 2);
    }
}
