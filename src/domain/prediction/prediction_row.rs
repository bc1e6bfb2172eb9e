// ============================================================
// PREDICTION ROW
// ============================================================
// One record of a prediction response, in field insertion order

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::CellValue;

/// Field that carries the provenance marker.
pub const SOURCE_FIELD: &str = "source";

/// Where a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Present in the uploaded dataset.
    Observed,
    /// Synthesized by the forecaster past the end of the observed series.
    Predicted,
}

/// Insertion-ordered mapping from column name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionRow(IndexMap<String, CellValue>);

impl PredictionRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for fixtures.
    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.insert(column, value.into());
        self
    }

    pub fn insert(&mut self, column: &str, value: CellValue) {
        self.0.insert(column.to_string(), value);
    }

    /// `None` when the row has no such field at all.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0.get(column)
    }

    /// Absent fields read as null.
    pub fn value(&self, column: &str) -> &CellValue {
        const NULL: &CellValue = &CellValue::Null;
        self.0.get(column).unwrap_or(NULL)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Observed unless the `source` marker reads exactly `"predicted"`.
    pub fn provenance(&self) -> Provenance {
        match self.get(SOURCE_FIELD).and_then(CellValue::as_text) {
            Some("predicted") => Provenance::Predicted,
            _ => Provenance::Observed,
        }
    }

    pub fn is_predicted(&self) -> bool {
        self.provenance() == Provenance::Predicted
    }
}

impl FromIterator<(String, CellValue)> for PredictionRow {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl AsRef<PredictionRow> for PredictionRow {
    fn as_ref(&self) -> &PredictionRow {
        self
    }
}
