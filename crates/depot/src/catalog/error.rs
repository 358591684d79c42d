//! Catalog error types.

use thiserror::Error;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while ingesting or persisting packages.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Original filename is empty or unusable after sanitizing.
    #[error("invalid filename: {0:?}")]
    InvalidFilename(String),

    /// No package with the given id or filename.
    #[error("package not found: {0}")]
    NotFound(String),

    /// An id or stored filename collided with an existing record.
    #[error("duplicate catalog entry: {0}")]
    Duplicate(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Store backend error.
    #[error("backend error: {0}")]
    Backend(String),
}
