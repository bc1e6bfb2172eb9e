pub mod error;
pub mod prediction_request;
pub mod preview;
pub mod upload;

// Prediction response model
pub mod prediction;
