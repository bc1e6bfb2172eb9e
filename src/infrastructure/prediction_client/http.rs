use super::PredictionService;
use crate::domain::error::{AppError, Result};
use crate::domain::prediction::PredictionResult;
use crate::domain::prediction_request::PredictionRequest;
use crate::domain::upload::UploadedFile;
use crate::infrastructure::config::PredictionConfig;
use crate::infrastructure::response::{error_from_body, parse_prediction_body};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// Multipart client for the external prediction service
pub struct HttpPredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        url::Url::parse(base_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid prediction service URL '{}': {}", base_url, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &PredictionConfig) -> Result<Self> {
        Self::new(config.base_url(), config.timeout())
    }

    pub fn endpoint(&self) -> String {
        format!("{}/predict", self.base_url)
    }

    fn form(file: &UploadedFile, request: &PredictionRequest) -> Result<Form> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| AppError::Internal(format!("Invalid upload part: {}", e)))?;

        Ok(Form::new()
            .part("file", part)
            .text("column", request.column.as_form_value().to_string())
            .text("steps", request.steps.to_string())
            .text("time_column", request.time_column.clone().unwrap_or_default())
            .text("group_column", request.group_column.clone().unwrap_or_default()))
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(&self, file: &UploadedFile, request: &PredictionRequest) -> Result<PredictionResult> {
        let form = Self::form(file, request)?;

        let response = self
            .client
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::TransportError(format!("Request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::TransportError(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(error_from_body(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                &text,
            ));
        }

        parse_prediction_body(&text, &request.column)
    }
}
