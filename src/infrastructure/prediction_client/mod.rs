pub mod http;

use crate::domain::error::Result;
use crate::domain::prediction::PredictionResult;
use crate::domain::prediction_request::PredictionRequest;
use crate::domain::upload::UploadedFile;
use async_trait::async_trait;

pub use http::HttpPredictionClient;

/// Anything that can forecast an uploaded dataset.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, file: &UploadedFile, request: &PredictionRequest) -> Result<PredictionResult>;
}
