//! Metadata sources for the mushaf reader

pub mod cache;
pub mod config;
pub mod sources;

use thiserror::Error;

// Re-exports
pub use cache::CachedEditions;
pub use config::{DataConfig, Providers, SourceFormat};
pub use sources::{
    CsvCanonicalSource, CsvEditionSource, ImagePageCount, SqliteCanonicalSource,
    SqliteEditionSource,
};

/// Errors that can occur while reading metadata
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{0}' is not a valid edition or table name")]
    InvalidIdentifier(String),

    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("{source_name} row {row}: {reason}")]
    InvalidRow {
        source_name: String,
        row: usize,
        reason: String,
    },
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}
