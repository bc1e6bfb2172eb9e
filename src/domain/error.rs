use serde::{Deserialize, Serialize};
use std::fmt;

pub const TRANSPORT_MESSAGE: &str =
    "Unable to reach the prediction service. Please check your connection and try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    InputError(String),
    ValidationError(String),
    ParseError(String),
    PredictionError(String),
    TransportError(String),
    ConfigError(String),
    IoError(String),
}

impl AppError {
    /// The single message string shown on the page for this error.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InputError(msg) => msg.clone(),
            AppError::TransportError(_) => TRANSPORT_MESSAGE.to_string(),
            AppError::ValidationError(msg) | AppError::PredictionError(msg) => {
                format!("Error: {}", msg)
            }
            other => format!("Error: {}", other),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InputError(msg) => write!(f, "Input error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |err| {
                    let message = err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| err.code.to_string());
                    format!("{}: {}", field, message)
                })
            })
            .collect();
        fields.sort();
        AppError::ValidationError(fields.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
