//! Shared helpers for integration tests

use std::io::Write;
use tempfile::NamedTempFile;

/// A timestamp most tests can share when the trend is not under test.
pub const TS: &str = "07/Feb/2024:10:15:32 -0500";

/// Format one combined-format access log line.
pub fn log_line(origin: &str, timestamp: &str, status: u16) -> String {
    format!(
        r#"{origin} - - [{timestamp}] "GET /index.html HTTP/1.1" {status} 512 "-" "integration-test""#
    )
}

/// Write newline-terminated lines to a temp file the binary can read.
pub fn write_log(lines: &[String]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file.flush().unwrap();
    file
}
