//! Error types for unidir operations.

use thiserror::Error;

use crate::{DirectoryId, RecordId, ValidationError};

/// Errors that can occur during data store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataStoreError {
    /// The requested item was not found in the data store.
    #[error("item not found in data store")]
    NotFound,
    /// An item with the same identifier already exists.
    #[error("item already exists in data store")]
    AlreadyExists,
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// An internal storage system error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for DataStoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DataStoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DataStoreError::AlreadyExists
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                DataStoreError::NotFound
            }
            sqlx::Error::ColumnDecode { source, .. } | sqlx::Error::Decode(source) => {
                DataStoreError::SerializationError(source.to_string())
            }
            _ => {
                tracing::error!(error = %e, "database error");
                DataStoreError::Internal(e.to_string())
            }
        }
    }
}

/// Errors returned by the directory and record services.
///
/// Validation failures carry the structured detail needed to render a precise
/// message; store failures are passed through untouched and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// No directory exists with this identifier.
    #[error("directory {0} not found")]
    DirectoryNotFound(DirectoryId),
    /// No record exists with this identifier.
    #[error("record {0} not found")]
    RecordNotFound(RecordId),
    /// The input was rejected by one of the validators.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] DataStoreError),
}

impl ServiceError {
    /// True when the failure was caused by the caller's input or by the state it
    /// referred to, as opposed to a store fault or corrupted directory state.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::DirectoryNotFound(_) | Self::RecordNotFound(_) => true,
            Self::Validation(e) => !e.is_internal(),
            Self::Store(_) => false,
        }
    }
}
