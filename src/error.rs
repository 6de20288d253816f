//! Error types for the query core and its stores

use thiserror::Error;

/// Failures raised by a [`crate::store::QuoteStore`] backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid stored record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

/// Failures surfaced by the query service
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed or out-of-range request parameters
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Upstream store failure: {0}")]
    Upstream(#[from] StoreError),
}

impl QueryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        QueryError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        QueryError::NotFound(msg.into())
    }
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
