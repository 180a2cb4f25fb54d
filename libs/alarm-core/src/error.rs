//! Alarm Core Error Types

use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type for alarm store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Threshold catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Same tag id declared twice
    #[error("Duplicate tag id: {0}")]
    DuplicateTag(String),

    /// Threshold boundaries are inconsistent
    #[error("Invalid threshold for {tag_id}: moderate={moderate}, critical={critical}")]
    InvalidThreshold {
        tag_id: String,
        moderate: f64,
        critical: f64,
    },

    /// Catalog file could not be read
    #[error("Catalog IO error: {0}")]
    Io(String),

    /// Catalog file could not be parsed
    #[error("Catalog parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(err: serde_yaml::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

/// Alarm store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Alarm not found
    #[error("Alarm not found: {0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}
