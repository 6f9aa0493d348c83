//! Error types shared across the indexing core

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors that can occur during indexing and search operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// No index is registered under the requested alias
    #[error("no index registered for alias '{0}'")]
    UnknownIndex(String),

    /// A filter, facet or sorter referenced a field the index was never told about
    #[error("field '{field}' is not declared on this index")]
    UnknownField { field: String },

    /// A filter, facet or sorter referenced a field with the wrong value kind
    #[error("field '{field}' expected kind {expected}, request used {requested}")]
    FieldKindMismatch {
        field: String,
        expected: String,
        requested: String,
    },

    /// Query text could not be parsed
    #[error("query parsing failed: {0}")]
    QueryParsingFailed(String),

    /// A document violates the document/variation invariant
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Content or ancestor lookup could not complete
    #[error("content resolution failed: {0}")]
    Resolution(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The underlying engine is unavailable (transient, distinct from not-found)
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// Not found errors
    #[error("not found: {0}")]
    NotFound(String),

    /// Engine-level errors
    #[error("engine error: {0}")]
    Engine(String),

    /// Stamp store errors
    #[error("stamp store error: {0}")]
    StampStore(String),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tantivy::TantivyError> for IndexError {
    fn from(err: tantivy::TantivyError) -> Self {
        IndexError::Engine(err.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for IndexError {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        IndexError::QueryParsingFailed(err.to_string())
    }
}

impl From<sled::Error> for IndexError {
    fn from(err: sled::Error) -> Self {
        IndexError::StampStore(err.to_string())
    }
}

impl From<bincode::Error> for IndexError {
    fn from(err: bincode::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for IndexError {
    fn from(err: config::ConfigError) -> Self {
        IndexError::Configuration(err.to_string())
    }
}
