//! Date-like column detection and best-effort temporal parsing

use crate::table::{ColumnData, TemporalCell};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Decides which columns are candidates for temporal conversion
pub trait DateColumnDetector: Send + Sync + std::fmt::Debug {
    fn is_date_column(&self, name: &str) -> bool;
}

/// Flags a column when its name contains any keyword, ignoring case.
///
/// This is a pure name heuristic: `bedtime_preference` matches `time`.
#[derive(Debug, Clone)]
pub struct NameSubstringDetector {
    keywords: Vec<String>,
}

impl NameSubstringDetector {
    pub fn new<S: AsRef<str>>(keywords: impl IntoIterator<Item = S>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }
}

impl Default for NameSubstringDetector {
    fn default() -> Self {
        Self::new(["date", "time"])
    }
}

impl DateColumnDetector for NameSubstringDetector {
    fn is_date_column(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

/// Parse one cell as a date or date-time
pub fn parse_temporal(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn to_cell(raw: String) -> TemporalCell {
    match parse_temporal(&raw) {
        Some(dt) => TemporalCell::Parsed(dt),
        None => TemporalCell::Unparsed(raw),
    }
}

/// Convert a column to temporal cells.
///
/// Returns `None` when nothing in the column parses, or the column is numeric;
/// the caller keeps the column as it was. Cells that fail to parse keep their
/// original text.
pub fn convert_column(data: &ColumnData) -> Option<ColumnData> {
    let converted: Vec<Option<TemporalCell>> = match data {
        ColumnData::Numeric(_) => return None,
        ColumnData::Categorical(values) => values
            .iter()
            .map(|v| v.clone().map(to_cell))
            .collect(),
        ColumnData::Temporal(values) => values
            .iter()
            .map(|v| {
                v.clone().map(|cell| match cell {
                    TemporalCell::Unparsed(raw) => to_cell(raw),
                    parsed => parsed,
                })
            })
            .collect(),
    };

    let any_parsed = converted.iter().flatten().any(TemporalCell::is_parsed);
    any_parsed.then_some(ColumnData::Temporal(converted))
}
