// ============================================================
// UPLOAD READER
// ============================================================
// Decode uploaded bytes and read the first rows for the data preview

use csv::{ReaderBuilder, Trim};
use encoding_rs::WINDOWS_1252;

use crate::domain::error::{AppError, Result};
use crate::domain::upload::DatasetPreview;

/// Decodes an upload as UTF-8, falling back to Windows-1252.
pub fn decode_upload(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(AppError::InputError(
            "The selected file is empty. Please choose a CSV file with a header row.".to_string(),
        ));
    }

    if let Ok(content) = std::str::from_utf8(bytes) {
        return Ok(content.to_string());
    }

    let (content, _, had_errors) = WINDOWS_1252.decode(bytes);
    if had_errors {
        tracing::warn!("Upload is neither valid UTF-8 nor Windows-1252; some characters were replaced");
    }
    Ok(content.into_owned())
}

/// Reads the leading rows of an uploaded dataset
pub struct UploadReader {
    /// Number of data rows kept for the preview
    data_rows: usize,
}

impl Default for UploadReader {
    fn default() -> Self {
        Self { data_rows: 5 }
    }
}

impl UploadReader {
    pub fn new(data_rows: usize) -> Self {
        Self { data_rows }
    }

    /// First rows of the dataset as raw text.
    ///
    /// A malformed record ends the preview instead of failing the upload;
    /// the prediction service does the real validation.
    pub fn preview(&self, content: &str) -> Result<DatasetPreview> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (index, record) in reader.records().take(self.data_rows).enumerate() {
            match record {
                Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
                Err(err) => {
                    tracing::warn!(row = index + 1, error = %err, "Stopping data preview at unreadable row");
                    break;
                }
            }
        }

        Ok(DatasetPreview { headers, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_upload("date,café\n".as_bytes()).unwrap(), "date,café\n");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // "café" with 0xE9 for é
        let bytes = [b'c', b'a', b'f', 0xE9, b'\n'];
        assert_eq!(decode_upload(&bytes).unwrap(), "café\n");
    }

    #[test]
    fn test_empty_upload_is_input_error() {
        assert!(matches!(decode_upload(&[]), Err(AppError::InputError(_))));
    }

    #[test]
    fn test_preview_limits_rows() {
        let content = "date,sales\n1,10\n2,20\n3,30\n";
        let preview = UploadReader::new(2).preview(content).unwrap();
        assert_eq!(preview.headers, vec!["date", "sales"]);
        assert_eq!(
            preview.rows,
            vec![vec!["1".to_string(), "10".to_string()], vec!["2".to_string(), "20".to_string()]]
        );
    }

    #[test]
    fn test_preview_handles_quoted_fields_and_ragged_rows() {
        let content = "name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\nshort\n";
        let preview = UploadReader::default().preview(content).unwrap();
        assert_eq!(preview.rows[0], vec!["Smith, J", "said \"hi\""]);
        assert_eq!(preview.rows[1], vec!["short"]);
    }
}
