//! CSV output format for spreadsheet analysis and machine parsing

use crate::analyzer::Analysis;

/// CSV row for a single origin
#[derive(Debug, Clone)]
pub struct CsvOriginRow {
    pub origin: String,
    pub requests: u64,
    pub failed_auth: u64,
    pub brute_force: bool,
    pub low_volume: bool,
}

/// CSV output formatter
#[derive(Debug)]
pub struct CsvReport {
    rows: Vec<CsvOriginRow>,
    /// (hour bucket, requests) rows; present only when the trend ran
    trend: Option<Vec<(String, u64)>>,
}

impl CsvReport {
    /// Build the per-origin table from a finished analysis. Rows come out
    /// sorted by request count descending, ties in first-seen order, with
    /// detector verdicts attached as flags.
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let flagged: Vec<&str> = analysis
            .brute_force
            .iter()
            .map(|finding| finding.origin.as_str())
            .collect();
        let low: Vec<&str> = analysis
            .outliers
            .low
            .iter()
            .map(|volume| volume.origin.as_str())
            .collect();

        let mut rows: Vec<CsvOriginRow> = analysis
            .table
            .iter()
            .map(|(origin, stats)| CsvOriginRow {
                origin: origin.to_string(),
                requests: stats.requests,
                failed_auth: stats.failed_auth,
                brute_force: flagged.contains(&origin),
                low_volume: low.contains(&origin),
            })
            .collect();
        rows.sort_by(|a, b| b.requests.cmp(&a.requests));

        let trend = analysis.trend.as_ref().map(|trend| {
            trend
                .hourly_series()
                .into_iter()
                .map(|(bucket, requests)| (bucket.to_rfc3339(), requests))
                .collect()
        });

        Self { rows, trend }
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_row(row: &CsvOriginRow) -> String {
        format!(
            "{},{},{},{},{}",
            Self::escape_field(&row.origin),
            row.requests,
            row.failed_auth,
            row.brute_force,
            row.low_volume
        )
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();

        output.push_str("origin,requests,failed_auth,brute_force,low_volume\n");
        for row in &self.rows {
            output.push_str(&Self::format_row(row));
            output.push('\n');
        }

        if let Some(trend) = &self.trend {
            output.push('\n');
            output.push_str("bucket,requests\n");
            for (bucket, requests) in trend {
                output.push_str(&format!("{},{requests}\n", Self::escape_field(bucket)));
            }
        }

        output
    }
}
