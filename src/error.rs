use crate::services::StoreError;
use thiserror::Error;

/// Errors surfaced by the search engine
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Query failed: {0}")]
    QueryFailed(#[from] StoreError),

    #[error("Unsupported export format: {0}")]
    UnsupportedExportFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type SearchResult<T> = Result<T, SearchError>;
