//! Error types for predios-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Lookup query failed: {0}")]
    Lookup(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Record has validation errors")]
    ValidationFailed,

    #[error("A commit is already in flight")]
    Busy,

    #[error("No record is under edit")]
    NoActiveRecord,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Reclassify a raw database failure as a lookup failure.
    ///
    /// Applied at the store trait boundary: callers get `Lookup` and
    /// `Persistence`, never a raw `Database` variant.
    pub(crate) fn into_lookup(self) -> Self {
        match self {
            CoreError::Database(msg) => CoreError::Lookup(msg),
            other => other,
        }
    }

    /// Reclassify a raw database failure as a persistence failure.
    pub(crate) fn into_persistence(self) -> Self {
        match self {
            CoreError::Database(msg) => CoreError::Persistence(msg),
            other => other,
        }
    }
}
