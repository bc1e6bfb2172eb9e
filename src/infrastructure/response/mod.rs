//! Interpretation of prediction service response bodies.
//!
//! Success bodies become a `PredictionResult`; error bodies become the
//! `AppError` kind the page reports.

use serde_json::Value as JsonValue;

use crate::domain::error::AppError;
use crate::domain::prediction::{MultiColumnResult, PredictionResult, SingleColumnResult};
use crate::domain::prediction_request::ColumnSelection;

/// Parses a 2xx body for the shape the request asked for.
pub fn parse_prediction_body(
    body: &str,
    column: &ColumnSelection,
) -> Result<PredictionResult, AppError> {
    let value: JsonValue = serde_json::from_str(body)
        .map_err(|e| AppError::ParseError(format!("Failed to parse JSON: {}", e)))?;

    // a top-level error message fails the whole request for either shape
    if let Some(JsonValue::String(message)) = value.get("error") {
        return Err(AppError::PredictionError(message.clone()));
    }

    match column {
        ColumnSelection::All => serde_json::from_value::<MultiColumnResult>(value)
            .map(PredictionResult::Multiple)
            .map_err(|e| AppError::ParseError(format!("Invalid multi-column response: {}", e))),
        ColumnSelection::Named(name) => {
            if let Some(message) = crate::domain::prediction::error_field(&value) {
                return Err(AppError::PredictionError(message));
            }
            let mut result: SingleColumnResult = serde_json::from_value(value)
                .map_err(|e| AppError::ParseError(format!("Invalid prediction response: {}", e)))?;
            if result.column.is_empty() {
                result.column = name.clone();
            }
            Ok(PredictionResult::Single(result))
        }
    }
}

/// Maps a non-2xx response to an error.
///
/// Understands `{"detail": "..."}`, `{"detail": [{"loc": [..], "msg": ".."}]}`
/// and `{"message": "..."}`; anything else reports the status text.
pub fn error_from_body(status: u16, status_text: &str, body: &str) -> AppError {
    let fallback = || {
        if status_text.trim().is_empty() {
            AppError::PredictionError(format!("Request failed with status {}", status))
        } else {
            AppError::PredictionError(status_text.to_string())
        }
    };

    let Ok(value) = serde_json::from_str::<JsonValue>(body) else {
        return fallback();
    };

    match value.get("detail") {
        Some(JsonValue::String(detail)) => return AppError::PredictionError(detail.clone()),
        Some(JsonValue::Array(entries)) if !entries.is_empty() => {
            let messages: Vec<String> = entries.iter().map(validation_entry).collect();
            return AppError::ValidationError(messages.join("; "));
        }
        Some(other) if !other.is_null() && !other.is_array() => {
            return AppError::PredictionError(other.to_string())
        }
        _ => {}
    }

    match value.get("message").or_else(|| value.get("error")) {
        Some(JsonValue::String(message)) => AppError::PredictionError(message.clone()),
        _ => fallback(),
    }
}

/// `field: msg` for one validation entry; the field is the last `loc` element.
fn validation_entry(entry: &JsonValue) -> String {
    let field = entry
        .get("loc")
        .and_then(JsonValue::as_array)
        .and_then(|loc| loc.last())
        .map(|last| match last {
            JsonValue::String(name) => name.clone(),
            other => other.to_string(),
        });
    let message = entry
        .get("msg")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| entry.to_string());

    match field {
        Some(field) => format!("{}: {}", field, message),
        None => message,
    }
}
