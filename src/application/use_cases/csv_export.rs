// ============================================================
// CSV EXPORT USE CASE
// ============================================================
// Serialize a merged table into the downloadable CSV document

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::row_merger::RowMerger;
use crate::domain::prediction::{CellValue, MergedTable, PredictionResult};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.\-]+").unwrap());

pub const DEFAULT_SINGLE_PREFIX: &str = "predictions";
pub const DEFAULT_MULTI_PREFIX: &str = "all_predictions";
const FALLBACK_NAME: &str = "data";

/// The downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvDocument {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct CsvExporter {
    single_prefix: String,
    multi_prefix: String,
    merger: RowMerger,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new(DEFAULT_SINGLE_PREFIX, DEFAULT_MULTI_PREFIX)
    }
}

impl CsvExporter {
    pub fn new(single_prefix: &str, multi_prefix: &str) -> Self {
        Self {
            single_prefix: single_prefix.to_string(),
            multi_prefix: multi_prefix.to_string(),
            merger: RowMerger::new(),
        }
    }

    /// Merge, serialize and name the export for `result`.
    ///
    /// `today` only matters for multi-column exports.
    pub fn export(&self, result: &PredictionResult, today: NaiveDate) -> CsvDocument {
        let table = self.merger.merge(result);
        CsvDocument {
            filename: self.filename(result, today),
            content: Self::to_csv(&table),
        }
    }

    /// Header line, then one line per row; every line ends with `\n`.
    pub fn to_csv(table: &MergedTable) -> String {
        let mut out = String::new();
        out.push_str(&table.columns.join(","));
        out.push('\n');

        for row in &table.rows {
            let fields: Vec<String> = table.row_values(row).map(Self::escape_field).collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }

        out
    }

    /// Text is always quoted, numbers never, null is an empty field.
    pub fn escape_field(value: &CellValue) -> String {
        match value {
            CellValue::Null => String::new(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(text) => format!("\"{}\"", text.replace('"', "\"\"")),
        }
    }

    pub fn filename(&self, result: &PredictionResult, today: NaiveDate) -> String {
        match result {
            PredictionResult::Single(single) => {
                format!("{}_{}.csv", self.single_prefix, sanitize(&single.column))
            }
            PredictionResult::Multiple(_) => {
                format!("{}_{}.csv", self.multi_prefix, today.format("%Y-%m-%d"))
            }
        }
    }
}

fn sanitize(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
