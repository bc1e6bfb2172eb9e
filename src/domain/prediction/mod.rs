// ============================================================
// PREDICTION DOMAIN LAYER
// ============================================================
// Core types for prediction responses and their derived tables
// No I/O, no async

mod cell_value;
mod merged_table;
mod prediction_result;
mod prediction_row;

pub use cell_value::CellValue;
pub use merged_table::MergedTable;
pub use prediction_result::{
    error_field, ColumnOutcome, MultiColumnResult, PredictionResult, SingleColumnResult,
};
pub use prediction_row::{PredictionRow, Provenance, SOURCE_FIELD};
