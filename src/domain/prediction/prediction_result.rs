// ============================================================
// PREDICTION RESULTS
// ============================================================
// Response shapes of the prediction service, single and multi column

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

use super::PredictionRow;

/// Predictions for exactly one target column from one forecasting run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleColumnResult {
    #[serde(alias = "target_column", default)]
    pub column: String,

    #[serde(default)]
    pub time_column: Option<String>,

    #[serde(default)]
    pub group_column: Option<String>,

    #[serde(default)]
    pub predictions: Vec<PredictionRow>,

    /// Horizon echoed back by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_method: Option<String>,
}

impl SingleColumnResult {
    pub fn new(column: &str, predictions: Vec<PredictionRow>) -> Self {
        Self {
            column: column.to_string(),
            time_column: None,
            group_column: None,
            predictions,
            steps: None,
            prediction_type: None,
            prediction_method: None,
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

    /// Declared time column, ignoring blanks.
    pub fn time_column(&self) -> Option<&str> {
        declared(self.time_column.as_deref())
    }

    /// Declared group column, ignoring blanks and the `"none"` sentinel.
    pub fn group_column(&self) -> Option<&str> {
        declared(self.group_column.as_deref()).filter(|name| !name.eq_ignore_ascii_case("none"))
    }
}

fn declared(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|name| !name.is_empty())
}

/// Outcome of forecasting one column inside a multi-column response.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnOutcome {
    Succeeded(SingleColumnResult),
    Failed { error: String },
}

impl ColumnOutcome {
    pub fn succeeded(&self) -> Option<&SingleColumnResult> {
        match self {
            ColumnOutcome::Succeeded(result) => Some(result),
            ColumnOutcome::Failed { .. } => None,
        }
    }

    /// Any object carrying a non-null `error` is a failure, whatever else it holds.
    pub fn from_json(column: &str, value: JsonValue) -> Result<Self, serde_json::Error> {
        if let Some(error) = error_field(&value) {
            return Ok(ColumnOutcome::Failed { error });
        }
        let mut result: SingleColumnResult = serde_json::from_value(value)?;
        if result.column.is_empty() {
            result.column = column.to_string();
        }
        Ok(ColumnOutcome::Succeeded(result))
    }
}

/// Extracts a non-null `error` member as text.
pub fn error_field(value: &JsonValue) -> Option<String> {
    match value.get("error")? {
        JsonValue::Null => None,
        JsonValue::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

impl Serialize for ColumnOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ColumnOutcome::Succeeded(result) => result.serialize(serializer),
            ColumnOutcome::Failed { error } => {
                serde_json::json!({ "error": error }).serialize(serializer)
            }
        }
    }
}

/// Ordered association list of column name to outcome.
///
/// Iteration order is the order the columns appeared in the response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiColumnResult {
    entries: Vec<(String, ColumnOutcome)>,
}

impl MultiColumnResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, or replaces the outcome in place when the name repeats.
    pub fn push(&mut self, column: &str, outcome: ColumnOutcome) {
        match self.entries.iter_mut().find(|(name, _)| name == column) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((column.to_string(), outcome)),
        }
    }

    pub fn with(mut self, column: &str, outcome: ColumnOutcome) -> Self {
        self.push(column, outcome);
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnOutcome> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnOutcome)> {
        self.entries
            .iter()
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    /// Successful results only, in mapping order.
    pub fn successes(&self) -> impl Iterator<Item = (&str, &SingleColumnResult)> {
        self.iter()
            .filter_map(|(name, outcome)| outcome.succeeded().map(|result| (name, result)))
    }

    /// `(column, error)` for every failed column, in mapping order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter_map(|(name, outcome)| match outcome {
            ColumnOutcome::Failed { error } => Some((name, error.as_str())),
            ColumnOutcome::Succeeded(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for MultiColumnResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, outcome) in &self.entries {
            map.serialize_entry(name, outcome)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MultiColumnResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = MultiColumnResult;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping column names to prediction results")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut result = MultiColumnResult::new();
                while let Some((column, value)) = access.next_entry::<String, JsonValue>()? {
                    let outcome =
                        ColumnOutcome::from_json(&column, value).map_err(de::Error::custom)?;
                    result.push(&column, outcome);
                }
                Ok(result)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// What the service returned for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PredictionResult {
    Single(SingleColumnResult),
    Multiple(MultiColumnResult),
}
