//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// 拡張子が .xlsx / .csv 以外
    #[error("Invalid file format: {0}. Please upload an Excel (.xlsx) or CSV (.csv) file.")]
    UnsupportedFormat(String),

    #[error("Required column \"{0}\" is missing in the file.")]
    MissingColumn(String),

    #[error("No valid data found in the file.")]
    EmptyDataset,

    #[error("Failed to parse {0} file. Please check the file format.")]
    Parse(String),

    #[error("Excel error: {0}")]
    Excel(String),

    #[error("Please enter a name for this evaluation project.")]
    ProjectNameRequired,

    #[error("No evaluation project is loaded.")]
    NoActiveProject,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "excel")]
impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Error::Excel(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_slot_file_converts_to_io() {
        let result: Result<String> = std::fs::read_to_string("/nonexistent/evaluation_project.json")
            .map_err(Error::from);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_error_display_missing_column() {
        let error = Error::MissingColumn("Answer_LLM".to_string());
        assert_eq!(
            error.to_string(),
            "Required column \"Answer_LLM\" is missing in the file."
        );
    }

    #[test]
    fn test_error_display_unsupported_format() {
        let error = Error::UnsupportedFormat("notes.txt".to_string());
        let display = error.to_string();
        assert!(display.contains("notes.txt"));
        assert!(display.contains(".xlsx"));
    }

    #[test]
    fn test_truncated_slot_is_json_error() {
        let error: Error = serde_json::from_str::<serde_json::Value>("{\"items\": [")
            .unwrap_err()
            .into();
        assert!(matches!(error, Error::Json(_)));
        assert!(error.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_parse_error_names_format() {
        assert_eq!(
            Error::Parse("CSV".into()).to_string(),
            "Failed to parse CSV file. Please check the file format."
        );
        assert_eq!(Error::EmptyDataset.to_string(), "No valid data found in the file.");
    }
}
