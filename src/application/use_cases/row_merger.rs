// ============================================================
// ROW MERGER USE CASE
// ============================================================
// Collapse a prediction result into one wide table keyed by (group, time)

use indexmap::{IndexMap, IndexSet};

use super::sort_key::sort_rows_by_column;
use crate::domain::prediction::{
    MergedTable, MultiColumnResult, PredictionResult, PredictionRow, SingleColumnResult,
};

/// Time half of a row identity.
///
/// A result without a declared time column is keyed by row position, so its
/// rows never fold into one another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TimeKey {
    Value(String),
    Position(usize),
}

/// Row identity inside a merge: canonical group text and the time key
type RowKey = (String, TimeKey);

/// Builds the `MergedTable` behind every CSV export
#[derive(Debug, Default, Clone, Copy)]
pub struct RowMerger;

impl RowMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, result: &PredictionResult) -> MergedTable {
        match result {
            PredictionResult::Single(single) => self.merge_single(single),
            PredictionResult::Multiple(multi) => self.merge_multiple(multi),
        }
    }

    /// Columns come from the first row; rows keep the service's order.
    pub fn merge_single(&self, result: &SingleColumnResult) -> MergedTable {
        let columns = result
            .predictions
            .first()
            .map(|row| row.columns().map(str::to_string).collect())
            .unwrap_or_default();
        MergedTable::new(columns, result.predictions.clone())
    }

    /// Two passes: index every contributing row by key, then flatten and sort.
    ///
    /// A mapping with one entry yields the same columns and rows as
    /// `merge_single`. Row order only matches when that entry's rows are
    /// already in time order: this path sorts by time across the whole table,
    /// so grouped rows come out interleaved by time rather than group by
    /// group.
    pub fn merge_multiple(&self, result: &MultiColumnResult) -> MergedTable {
        let mut builders: IndexMap<RowKey, PredictionRow> = IndexMap::new();
        let mut columns: IndexSet<String> = IndexSet::new();
        let mut sort_column: Option<Option<&str>> = None;

        // Pass 1: index
        for (name, single) in result.successes() {
            sort_column.get_or_insert(single.time_column());
            let time_column = single.time_column();
            let group_column = single.group_column();
            if time_column.is_none() && !single.predictions.is_empty() {
                tracing::debug!(
                    column = %name,
                    rows = single.predictions.len(),
                    "No time column declared, keying rows by position"
                );
            }

            for (position, row) in single.predictions.iter().enumerate() {
                let Some(key) = row_key(row, position, time_column, group_column) else {
                    tracing::warn!(
                        column = %name,
                        time_column = ?time_column,
                        group_column = ?group_column,
                        "Skipping prediction row without its key fields"
                    );
                    continue;
                };

                columns.extend(row.columns().map(str::to_string));

                match builders.get_mut(&key) {
                    Some(target) => {
                        if let Some(value) = row.get(name) {
                            target.insert(name, value.clone());
                        }
                    }
                    None => {
                        builders.insert(key, row.clone());
                    }
                }
            }
        }

        // Pass 2: flatten in key order, then stable sort by the first time column
        let mut rows: Vec<PredictionRow> = builders.into_values().collect();
        if let Some(Some(time_column)) = sort_column {
            sort_rows_by_column(&mut rows, time_column);
        }

        MergedTable::new(columns.into_iter().collect(), rows)
    }
}

/// `None` when the row lacks a field its result declares as a key.
fn row_key(
    row: &PredictionRow,
    position: usize,
    time_column: Option<&str>,
    group_column: Option<&str>,
) -> Option<RowKey> {
    let key_text = |column: &str| row.get(column).map(|value| value.key_text().into_owned());

    let group = match group_column {
        Some(column) => key_text(column)?,
        None => String::new(),
    };
    let time = match time_column {
        Some(column) => TimeKey::Value(key_text(column)?),
        None => TimeKey::Position(position),
    };
    Some((group, time))
}
