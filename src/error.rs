use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Error type covering the different failure cases that can occur while the
/// scanner ingests worksheets, runs checks, or emits reports.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON serialization of a report fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a required sheet is absent from the workbook.
    #[error("missing sheet '{0}'")]
    MissingSheet(String),

    /// Raised when a sheet lacks a required header column.
    #[error("sheet '{sheet}' is missing column '{column}'")]
    MissingColumn { sheet: String, column: String },

    /// Raised when a cell cannot be parsed as the expected type.
    #[error("invalid value '{value}' in column {column} of sheet '{sheet}'")]
    InvalidCell {
        sheet: String,
        column: String,
        value: String,
    },

    /// Raised when a timestamp or yyyymmdd date fails to parse.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// Raised when a forecast cannot be fitted to the available history.
    #[error("forecast error: {0}")]
    Forecast(String),

    /// Raised when rendering a forecast plot fails.
    #[error("plot error: {0}")]
    Plot(String),

    /// Raised when a dependency manifest line is not a valid requirement.
    #[error("manifest line {line}: {reason}")]
    Manifest { line: usize, reason: String },

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
