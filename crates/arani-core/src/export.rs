//! CSV report export.
//!
//! Fields are wrapped in double quotes without escaping embedded quotes;
//! a subject name containing `"` produces a malformed row.

use crate::types::{DetectionEvent, EventStatus};
use std::fmt;
use std::str::FromStr;

const HEADER: &str = "Name,Timestamp,Status";
const HEADER_WITH_ID: &str = "ID,Name,Timestamp,Status";

/// Which events a report includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ExportFilter {
    #[default]
    All,
    Authorized,
    /// Unauthorized events only.
    Breaches,
}

impl ExportFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFilter::All => "all",
            ExportFilter::Authorized => "authorized",
            ExportFilter::Breaches => "breaches",
        }
    }

    pub fn matches(&self, status: EventStatus) -> bool {
        match self {
            ExportFilter::All => true,
            ExportFilter::Authorized => status == EventStatus::Authorized,
            ExportFilter::Breaches => status == EventStatus::Unauthorized,
        }
    }

    /// `report_<filter>.csv`
    pub fn file_name(&self) -> String {
        format!("report_{}.csv", self.as_str())
    }
}

impl fmt::Display for ExportFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(ExportFilter::All),
            "authorized" => Ok(ExportFilter::Authorized),
            "breaches" => Ok(ExportFilter::Breaches),
            other => Err(format!(
                "unknown filter '{other}' (expected all, authorized or breaches)"
            )),
        }
    }
}

/// A rendered report, ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub file_name: String,
    pub body: String,
    pub rows: usize,
}

/// Render `events` matching `filter` as CSV.
///
/// Output is a header line followed by one line per event in store order,
/// joined with `\n` and without a trailing newline. Deterministic for a
/// given snapshot and filter.
pub fn render_csv(events: &[DetectionEvent], filter: ExportFilter, include_id: bool) -> Report {
    let rows: Vec<String> = events
        .iter()
        .filter(|e| filter.matches(e.status))
        .map(|e| {
            let fields = format!("\"{}\",\"{}\",\"{}\"", e.subject_name, e.timestamp, e.status);
            if include_id {
                format!("{},{fields}", e.id)
            } else {
                fields
            }
        })
        .collect();

    let header = if include_id { HEADER_WITH_ID } else { HEADER };
    Report {
        file_name: filter.file_name(),
        body: format!("{header}\n{}", rows.join("\n")),
        rows: rows.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<DetectionEvent> {
        vec![
            DetectionEvent {
                id: 1,
                subject_name: "Alice".into(),
                timestamp: "2024-01-01T00:00:00Z".into(),
                status: EventStatus::Authorized,
            },
            DetectionEvent {
                id: 2,
                subject_name: "Bob".into(),
                timestamp: "2024-01-01T00:01:00Z".into(),
                status: EventStatus::Unauthorized,
            },
        ]
    }

    #[test]
    fn test_breaches_report_exact_body() {
        let report = render_csv(&sample(), ExportFilter::Breaches, false);
        assert_eq!(
            report.body,
            "Name,Timestamp,Status\n\"Bob\",\"2024-01-01T00:01:00Z\",\"unauthorized\""
        );
        assert_eq!(report.file_name, "report_breaches.csv");
        assert_eq!(report.rows, 1);
    }

    #[test]
    fn test_all_report_keeps_store_order() {
        let report = render_csv(&sample(), ExportFilter::All, false);
        let lines: Vec<&str> = report.body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("\"Alice\""));
        assert!(lines[2].starts_with("\"Bob\""));
    }

    #[test]
    fn test_authorized_filter() {
        let report = render_csv(&sample(), ExportFilter::Authorized, false);
        assert_eq!(
            report.body,
            "Name,Timestamp,Status\n\"Alice\",\"2024-01-01T00:00:00Z\",\"authorized\""
        );
    }

    #[test]
    fn test_id_column() {
        let report = render_csv(&sample(), ExportFilter::All, true);
        let lines: Vec<&str> = report.body.lines().collect();
        assert_eq!(lines[0], "ID,Name,Timestamp,Status");
        assert_eq!(lines[1], "1,\"Alice\",\"2024-01-01T00:00:00Z\",\"authorized\"");
    }

    #[test]
    fn test_empty_selection_is_header_only() {
        let report = render_csv(&[], ExportFilter::All, false);
        assert_eq!(report.body, "Name,Timestamp,Status\n");
        assert_eq!(report.rows, 0);
    }

    #[test]
    fn test_render_is_idempotent() {
        let events = sample();
        let a = render_csv(&events, ExportFilter::All, true);
        let b = render_csv(&events, ExportFilter::All, true);
        assert_eq!(a.body.as_bytes(), b.body.as_bytes());
    }

    #[test]
    fn test_embedded_quote_not_escaped() {
        let mut events = sample();
        events[0].subject_name = "Al \"Ace\"".into();
        let report = render_csv(&events[..1], ExportFilter::All, false);
        assert!(report.body.contains("\"Al \"Ace\"\""));
    }

    #[test]
    fn test_filter_parse_and_file_name() {
        assert_eq!("all".parse::<ExportFilter>().unwrap().file_name(), "report_all.csv");
        assert_eq!(
            "authorized".parse::<ExportFilter>().unwrap(),
            ExportFilter::Authorized
        );
        assert!("everything".parse::<ExportFilter>().is_err());
    }
}
