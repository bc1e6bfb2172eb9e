//! Display-side view of a prediction result.
//!
//! Every value here is already formatted for the page; nothing in this
//! module feeds back into exported data.

use serde::Serialize;

/// Placeholder shown for null, absent and empty cells.
pub const EMPTY_CELL: &str = "-";

/// Label shown for rows whose group value is missing.
pub const MISSING_GROUP_LABEL: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPreview {
    pub sections: Vec<ColumnSection>,
}

impl PredictionPreview {
    pub fn section(&self, column: &str) -> Option<&ColumnSection> {
        self.sections.iter().find(|section| section.column() == column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ColumnSection {
    Table(ColumnTable),
    Failed { column: String, error: String },
    Empty { column: String },
}

impl ColumnSection {
    pub fn column(&self) -> &str {
        match self {
            ColumnSection::Table(table) => &table.column,
            ColumnSection::Failed { column, .. } | ColumnSection::Empty { column } => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnTable {
    pub column: String,
    pub group_column: Option<String>,
    pub groups: Vec<GroupTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTable {
    /// `None` for the implicit single group
    pub label: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<PreviewRow>,
    pub total_rows: usize,
    pub hidden_rows: usize,
    /// "... and K more rows" when rows were capped
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub cells: Vec<String>,
    pub predicted: bool,
}
