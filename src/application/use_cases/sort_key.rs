//! Ordering of time-column values
//!
//! Values are compared as numbers when they parse as finite numbers, as
//! timestamps when they parse as dates, and as text otherwise. Nulls always
//! sort first.
//!
//! Sorting a whole column classifies it once (`SortKeyKind::classify`) and
//! compares every pair under that one policy. Deciding per pair is not a
//! total order on mixed columns (`"10"`, `"2024-01-05"`, `"9"` can cycle),
//! so `compare_values` is only used for isolated comparisons.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;

use crate::domain::prediction::{CellValue, PredictionRow};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// How a column's values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKeyKind {
    Numeric,
    Chronological,
    Lexical,
}

impl SortKeyKind {
    /// Picks the strictest policy every non-null value satisfies.
    pub fn classify<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a CellValue>,
    {
        let mut numeric = true;
        let mut chronological = true;
        let mut seen = false;

        for value in values.into_iter().filter(|value| !value.is_null()) {
            seen = true;
            numeric = numeric && parse_number(value).is_some();
            chronological = chronological && parse_timestamp(value).is_some();
            if !numeric && !chronological {
                return SortKeyKind::Lexical;
            }
        }

        match (seen, numeric, chronological) {
            (false, _, _) => SortKeyKind::Lexical,
            (true, true, _) => SortKeyKind::Numeric,
            (true, false, true) => SortKeyKind::Chronological,
            _ => SortKeyKind::Lexical,
        }
    }

    /// Compares two values under this policy; nulls sort first.
    ///
    /// A value that does not fit the policy falls back to lexical order
    /// against its peer, which only happens when the policy was chosen for a
    /// different set of values.
    pub fn compare(self, a: &CellValue, b: &CellValue) -> Ordering {
        if let Some(ordering) = compare_nulls(a, b) {
            return ordering;
        }
        let typed = match self {
            SortKeyKind::Numeric => match (parse_number(a), parse_number(b)) {
                (Some(x), Some(y)) => Some(x.total_cmp(&y)),
                _ => None,
            },
            SortKeyKind::Chronological => match (parse_timestamp(a), parse_timestamp(b)) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => None,
            },
            SortKeyKind::Lexical => None,
        };
        typed.unwrap_or_else(|| compare_lexical(a, b))
    }
}

/// Pairwise comparison: null, then numeric, then date, then lexical.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    if let Some(ordering) = compare_nulls(a, b) {
        return ordering;
    }
    if let (Some(x), Some(y)) = (parse_number(a), parse_number(b)) {
        return x.total_cmp(&y);
    }
    if let (Some(x), Some(y)) = (parse_timestamp(a), parse_timestamp(b)) {
        return x.cmp(&y);
    }
    compare_lexical(a, b)
}

/// Stable sort of rows by one column, classified once over all rows.
pub fn sort_rows_by_column<R>(rows: &mut [R], column: &str)
where
    R: AsRef<PredictionRow>,
{
    let kind = SortKeyKind::classify(rows.iter().map(|row| row.as_ref().value(column)));
    rows.sort_by(|a, b| kind.compare(a.as_ref().value(column), b.as_ref().value(column)));
}

fn compare_nulls(a: &CellValue, b: &CellValue) -> Option<Ordering> {
    match (a.is_null(), b.is_null()) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        (false, false) => None,
    }
}

fn compare_lexical(a: &CellValue, b: &CellValue) -> Ordering {
    a.to_string().cmp(&b.to_string())
}

/// Finite number, from a number or from text that trims to one.
pub fn parse_number(value: &CellValue) -> Option<f64> {
    value.as_number()
}

/// Timestamp from date-like text. Numbers are never dates.
pub fn parse_timestamp(value: &CellValue) -> Option<NaiveDateTime> {
    let text = value.as_text()?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.naive_utc());
    }
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(parsed);
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
