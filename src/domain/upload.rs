use serde::Serialize;

/// First rows of an uploaded dataset, as raw text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// The file currently selected on the page.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub headers: Vec<String>,
    pub preview: DatasetPreview,
}

impl UploadedFile {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|header| header == column)
    }

    pub fn summary(&self) -> UploadSummary {
        UploadSummary {
            file_name: self.file_name.clone(),
            columns: self.headers.clone(),
            preview: self.preview.clone(),
        }
    }
}

/// What the page needs back after a file is selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadSummary {
    pub file_name: String,
    pub columns: Vec<String>,
    pub preview: DatasetPreview,
}
