// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Upload decoding and dataset preview reading

mod upload_reader;

pub use upload_reader::{decode_upload, UploadReader};
