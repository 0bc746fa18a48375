//! Combined log format line grammar
//!
//! Parses single access log lines into structured records. The grammar is
//! anchored at the start of the line and matched as a prefix: text after
//! the user agent's closing quote is ignored. Parsing is total over its
//! input set (never panics) and deterministic.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Anchored combined-format grammar. Quoted fields are non-greedy with no
/// escape support. IPv4 octets are digit runs without range checks, and a
/// `-` byte count (as sent for 304 responses by some servers) does not
/// match.
static LINE_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(\d+\.\d+\.\d+\.\d+) - - \[(.*?)\] "(.*?)" (\d+) (\d+) "(.*?)" "(.*?)""#)
        .expect("access log grammar is a valid regex")
});

/// One parsed access log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRecord {
    /// Client IPv4 address as written in the log.
    pub origin: String,
    /// Raw bracketed timestamp field, e.g. `07/Feb/2024:10:15:32 -0500`.
    /// Validated only by the trend stage, never here.
    pub timestamp: String,
    /// Request line, e.g. `GET /index.html HTTP/1.1`.
    pub request: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body size in bytes.
    pub bytes_sent: u64,
    /// Referrer header value, `-` when absent.
    pub referrer: String,
    /// User agent header value.
    pub user_agent: String,
}

impl AccessRecord {
    /// Whether this record counts as a failed authentication attempt
    /// (HTTP 401 or 403).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status, 401 | 403)
    }
}

/// Why a line was rejected. Carries the raw line so callers can log it.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The line does not match the combined log grammar.
    #[error("line does not match the combined log grammar: {line:?}")]
    Grammar { line: String },
    /// A field matched the grammar's digit run but overflows its type.
    #[error("{field} out of range in line: {line:?}")]
    NumericRange { field: &'static str, line: String },
}

impl ParseError {
    /// The raw line that was rejected.
    pub fn line(&self) -> &str {
        match self {
            Self::Grammar { line } | Self::NumericRange { line, .. } => line,
        }
    }
}

/// Parse one log line into an [`AccessRecord`].
///
/// Returns [`ParseError::Grammar`] when the line does not match the
/// combined format, and [`ParseError::NumericRange`] when the status or
/// byte count is a digit run too large for its field. Callers are expected
/// to skip failed lines and continue.
pub fn parse_line(line: &str) -> Result<AccessRecord, ParseError> {
    let caps = LINE_GRAMMAR.captures(line).ok_or_else(|| ParseError::Grammar {
        line: line.to_string(),
    })?;

    let status: u16 = caps[4].parse().map_err(|_| ParseError::NumericRange {
        field: "status",
        line: line.to_string(),
    })?;
    let bytes_sent: u64 = caps[5].parse().map_err(|_| ParseError::NumericRange {
        field: "bytes_sent",
        line: line.to_string(),
    })?;

    Ok(AccessRecord {
        origin: caps[1].to_string(),
        timestamp: caps[2].to_string(),
        request: caps[3].to_string(),
        status,
        bytes_sent,
        referrer: caps[6].to_string(),
        user_agent: caps[7].to_string(),
    })
}
