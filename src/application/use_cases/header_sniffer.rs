//! Column headers from the first line of an uploaded CSV.
//!
//! Deliberately shallow: comma only, no quoting, no type inference. The
//! prediction service does the real parsing.

use crate::domain::error::{AppError, Result};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Splits the first line on commas and trims every field.
///
/// Text without a newline is treated as a header line on its own.
pub fn sniff_headers(text: &str) -> Result<Vec<String>> {
    let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
    if text.trim().is_empty() {
        return Err(AppError::InputError(
            "The selected file is empty. Please choose a CSV file with a header row.".to_string(),
        ));
    }

    let header_line = text.split_once('\n').map_or(text, |(first, _)| first);

    Ok(header_line
        .split(',')
        .map(|field| field.trim().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_from_first_line() {
        let headers = sniff_headers("date, sales ,region\n2024-01-01,10,north\n").unwrap();
        assert_eq!(headers, vec!["date", "sales", "region"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let headers = sniff_headers("date,value\r\n2023-01-01,100\r\n").unwrap();
        assert_eq!(headers, vec!["date", "value"]);
    }

    #[test]
    fn test_text_without_newline_is_header() {
        assert_eq!(sniff_headers("a,b,c").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_byte_order_mark_is_dropped() {
        assert_eq!(sniff_headers("\u{feff}id,name\n1,x").unwrap(), vec!["id", "name"]);
    }

    #[test]
    fn test_empty_text_is_input_error() {
        assert!(matches!(sniff_headers("  \n"), Err(AppError::InputError(_))));
    }
}
