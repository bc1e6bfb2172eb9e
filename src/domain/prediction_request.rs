use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Wire sentinel that asks the service for every numeric column.
pub const ALL_COLUMNS: &str = "all";

/// Group column value that turns grouping off instead of auto-detecting it.
pub const NO_GROUP: &str = "none";

pub const MIN_STEPS: u32 = 1;
pub const MAX_STEPS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnSelection {
    All,
    Named(String),
}

impl ColumnSelection {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case(ALL_COLUMNS) {
            ColumnSelection::All
        } else {
            ColumnSelection::Named(trimmed.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ColumnSelection::All)
    }

    /// Value sent in the `column` form field.
    pub fn as_form_value(&self) -> &str {
        match self {
            ColumnSelection::All => ALL_COLUMNS,
            ColumnSelection::Named(name) => name,
        }
    }
}

impl From<String> for ColumnSelection {
    fn from(value: String) -> Self {
        ColumnSelection::parse(&value)
    }
}

impl From<ColumnSelection> for String {
    fn from(value: ColumnSelection) -> Self {
        value.as_form_value().to_string()
    }
}

impl fmt::Display for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_form_value())
    }
}

/// A resolved prediction request.
///
/// Time and group columns are already resolved: `None` lets the service
/// detect them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PredictionRequest {
    pub column: ColumnSelection,

    #[validate(range(min = 1, max = 30, message = "must be between 1 and 30"))]
    pub steps: u32,

    pub time_column: Option<String>,

    pub group_column: Option<String>,
}

impl PredictionRequest {
    pub fn new(column: ColumnSelection, steps: u32) -> Self {
        Self {
            column,
            steps,
            time_column: None,
            group_column: None,
        }
    }

    pub fn with_time_column(mut self, column: &str) -> Self {
        self.time_column = Some(column.to_string());
        self
    }

    pub fn with_group_column(mut self, column: &str) -> Self {
        self.group_column = Some(column.to_string());
        self
    }

    /// Group column that must exist in the dataset; `None` when grouping is
    /// left to the service or turned off with `"none"`.
    pub fn dataset_group_column(&self) -> Option<&str> {
        self.group_column
            .as_deref()
            .filter(|column| !column.eq_ignore_ascii_case(NO_GROUP))
    }
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self::new(ColumnSelection::All, 5)
    }
}
