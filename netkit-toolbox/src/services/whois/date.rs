//! Date parsing for WHOIS free text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// One accepted date layout.
#[derive(Debug, Clone, Copy)]
enum Layout {
    /// RFC 3339 with an explicit offset.
    Rfc3339,
    /// Naive date-time interpreted as UTC.
    DateTime(&'static str),
    /// Date only, midnight UTC.
    Date(&'static str),
}

/// Tried in order; the first layout that parses wins.
const LAYOUTS: &[Layout] = &[
    Layout::Rfc3339,
    Layout::DateTime("%Y-%m-%dT%H:%M:%SZ"),
    Layout::DateTime("%Y-%m-%dT%H:%M:%S"),
    Layout::DateTime("%Y-%m-%d %H:%M:%S"),
    Layout::Date("%Y-%m-%d"),
    Layout::Date("%d-%b-%Y"),
    Layout::Date("%B %d %Y"),
    Layout::Date("%-d-%b-%Y"),
    Layout::Date("%Y/%m/%d"),
];

/// Parses the date formats registries commonly emit.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateParser;

impl DateParser {
    /// Returns `None` when no layout matches. Absence is not an error.
    pub fn parse(text: &str) -> Option<DateTime<Utc>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        LAYOUTS.iter().find_map(|layout| parse_with(*layout, text))
    }
}

fn parse_with(layout: Layout, text: &str) -> Option<DateTime<Utc>> {
    match layout {
        Layout::Rfc3339 => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Layout::DateTime(fmt) => NaiveDateTime::parse_from_str(text, fmt)
            .ok()
            .map(|dt| dt.and_utc()),
        Layout::Date(fmt) => NaiveDate::parse_from_str(text, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc()),
    }
}
