// ============================================================
// RESULT RENDERER USE CASE
// ============================================================
// Build the capped, grouped, time-sorted preview shown on the page

use super::group_partitioner::{partition_rows, GroupKey, RowGroup};
use crate::domain::prediction::{CellValue, ColumnOutcome, PredictionResult, SingleColumnResult};
use crate::domain::preview::{
    ColumnSection, ColumnTable, GroupTable, PredictionPreview, PreviewRow, EMPTY_CELL,
};

pub const DEFAULT_ROW_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy)]
pub struct ResultRenderer {
    row_limit: usize,
}

impl Default for ResultRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_ROW_LIMIT)
    }
}

impl ResultRenderer {
    pub fn new(row_limit: usize) -> Self {
        Self { row_limit }
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// One section per column, in response order.
    pub fn render(&self, result: &PredictionResult) -> PredictionPreview {
        let sections = match result {
            PredictionResult::Single(single) => vec![self.render_column(&single.column, single)],
            PredictionResult::Multiple(multi) => multi
                .iter()
                .map(|(name, outcome)| match outcome {
                    ColumnOutcome::Succeeded(single) => self.render_column(name, single),
                    ColumnOutcome::Failed { error } => ColumnSection::Failed {
                        column: name.to_string(),
                        error: error.clone(),
                    },
                })
                .collect(),
        };
        PredictionPreview { sections }
    }

    fn render_column(&self, column: &str, result: &SingleColumnResult) -> ColumnSection {
        if result.predictions.is_empty() {
            return ColumnSection::Empty {
                column: column.to_string(),
            };
        }

        let mut groups = partition_rows(&result.predictions, result.group_column());
        for group in &mut groups {
            group.sort_by_time(result.time_column());
        }

        let grouped = groups.iter().any(|group| group.key != GroupKey::All);
        ColumnSection::Table(ColumnTable {
            column: column.to_string(),
            group_column: grouped
                .then(|| result.group_column().map(str::to_string))
                .flatten(),
            groups: groups.iter().map(|group| self.render_group(group)).collect(),
        })
    }

    fn render_group(&self, group: &RowGroup<'_>) -> GroupTable {
        let headers = group.columns();
        let rows = group
            .rows
            .iter()
            .take(self.row_limit)
            .map(|row| PreviewRow {
                cells: headers
                    .iter()
                    .map(|header| Self::format_cell(row.get(header)))
                    .collect(),
                predicted: row.is_predicted(),
            })
            .collect();

        let total_rows = group.len();
        let hidden_rows = total_rows.saturating_sub(self.row_limit);

        GroupTable {
            label: group.key.label(),
            headers,
            rows,
            total_rows,
            hidden_rows,
            summary: (hidden_rows > 0).then(|| format!("... and {} more rows", hidden_rows)),
        }
    }

    /// Display text for one cell: numbers to 2 decimals, blanks as a dash.
    pub fn format_cell(value: Option<&CellValue>) -> String {
        match value {
            Some(CellValue::Number(n)) => format!("{:.2}", n),
            Some(CellValue::Text(text)) if !text.is_empty() => text.clone(),
            _ => EMPTY_CELL.to_string(),
        }
    }
}
