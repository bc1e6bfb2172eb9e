pub mod use_cases;

pub use use_cases::csv_export::{CsvDocument, CsvExporter};
pub use use_cases::prediction_session::{PredictionSession, SessionStatus};
pub use use_cases::result_renderer::ResultRenderer;
pub use use_cases::row_merger::RowMerger;
