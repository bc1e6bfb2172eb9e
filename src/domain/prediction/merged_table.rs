// ============================================================
// MERGED TABLE
// ============================================================
// Rectangular table produced by the row merger

use serde::Serialize;

use super::{CellValue, PredictionRow};

/// Union of all contributing columns and the assembled rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedTable {
    /// Distinct column names, first-seen order
    pub columns: Vec<String>,

    /// Assembled rows; a column missing from a row reads as empty
    pub rows: Vec<PredictionRow>,
}

impl MergedTable {
    pub fn new(columns: Vec<String>, rows: Vec<PredictionRow>) -> Self {
        Self { columns, rows }
    }

    /// Values of one row in `columns` order.
    pub fn row_values<'a>(&'a self, row: &'a PredictionRow) -> impl Iterator<Item = &'a CellValue> {
        self.columns.iter().map(move |column| row.value(column))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
