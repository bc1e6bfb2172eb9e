// ============================================================
// CELL VALUE
// ============================================================
// Scalar carried in a prediction row: number, text or null

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::fmt;

/// A single scalar from a prediction row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Null or text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Finite number, from a number or from text that trims to one.
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok()?
            }
            CellValue::Null => return None,
        };
        number.is_finite().then_some(number)
    }

    /// Canonical text used for identity comparisons.
    ///
    /// Null is the empty string, so a missing key component and a null one
    /// coincide. Anything numeric-looking uses the default decimal form of
    /// its number, which makes `2023`, `"2023"`, `"2023.0"` and `"02023"`
    /// equal.
    pub fn key_text(&self) -> Cow<'_, str> {
        if let Some(number) = self.as_number() {
            return Cow::Owned(number.to_string());
        }
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(n.to_string()),
            CellValue::Text(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<JsonValue> for CellValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => CellValue::Null,
            JsonValue::Number(n) => n
                .as_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::Text(n.to_string())),
            JsonValue::String(text) => CellValue::Text(text),
            JsonValue::Bool(flag) => CellValue::Text(flag.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_unit(),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Text(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(CellValue::from)
    }
}
