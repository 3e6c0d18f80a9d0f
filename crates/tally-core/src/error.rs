//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// The statement file as a whole could not be read. The import job that
    /// produced it is kept with status `needs_review`.
    #[error("Could not parse file: {message}")]
    Parse { import_id: i64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Oracle error: {0}")]
    Oracle(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single statement row could not become a transaction.
///
/// Row errors never abort an import; their `Display` text is what lands in the
/// review queue and in the job notes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("mapping_not_found")]
    MappingNotFound,

    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for RowError {
    fn from(e: rusqlite::Error) -> Self {
        RowError::Storage(e.to_string())
    }
}
