//! Splits prediction rows into display groups.
//!
//! Groups come out in the order their key is first seen, and rows keep their
//! relative order inside a group. Keys compare by canonical text, so `2023`
//! and `"2023"` land in the same group.

use indexmap::{IndexMap, IndexSet};

use super::sort_key::sort_rows_by_column;
use crate::domain::prediction::{CellValue, PredictionRow};
use crate::domain::preview::MISSING_GROUP_LABEL;

#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// Single implicit group when no grouping applies
    All,
    /// Rows whose group value is null, absent or blank
    Missing,
    Value(CellValue),
}

impl GroupKey {
    /// `None` for the implicit group.
    pub fn label(&self) -> Option<String> {
        match self {
            GroupKey::All => None,
            GroupKey::Missing => Some(MISSING_GROUP_LABEL.to_string()),
            GroupKey::Value(value) => Some(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup<'a> {
    pub key: GroupKey,
    pub rows: Vec<&'a PredictionRow>,
}

impl<'a> RowGroup<'a> {
    fn new(key: GroupKey) -> Self {
        Self {
            key,
            rows: Vec::new(),
        }
    }

    /// Stable sort by the time column; a no-op without one.
    pub fn sort_by_time(&mut self, time_column: Option<&str>) {
        if let Some(column) = time_column {
            sort_rows_by_column(&mut self.rows, column);
        }
    }

    /// Union of field names across the group, first-seen order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: IndexSet<&str> = IndexSet::new();
        for row in &self.rows {
            columns.extend(row.columns());
        }
        columns.into_iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Partitions rows by the named column.
///
/// Without a group column, or when no row carries it, every row goes into a
/// single implicit group.
pub fn partition_rows<'a>(rows: &'a [PredictionRow], group_column: Option<&str>) -> Vec<RowGroup<'a>> {
    let column = match group_column {
        Some(column) if rows.iter().any(|row| row.contains(column)) => column,
        _ => {
            let mut group = RowGroup::new(GroupKey::All);
            group.rows.extend(rows.iter());
            return vec![group];
        }
    };

    // None collects the rows without a usable group value
    let mut groups: IndexMap<Option<String>, RowGroup<'a>> = IndexMap::new();
    for row in rows {
        let value = row.value(column);
        let ident = (!value.is_blank()).then(|| value.key_text().into_owned());
        groups
            .entry(ident)
            .or_insert_with(|| {
                RowGroup::new(if value.is_blank() {
                    GroupKey::Missing
                } else {
                    GroupKey::Value(value.clone())
                })
            })
            .rows
            .push(row);
    }

    groups.into_values().collect()
}
