//! Error types for the document store

use std::path::PathBuf;

/// Errors raised by a [`DocumentStore`](crate::DocumentStore) backend
///
/// Parameter records never recover from these locally; they surface to the
/// caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// IO error while reading or writing a collection file
    #[error("io error at {path}: {source}")]
    Io {
        /// File or directory being accessed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collection file exists but does not hold a list of documents
    #[error("corrupt collection {namespace}: {message}")]
    Corrupt {
        /// `database.collection` of the bad file
        namespace: String,
        /// What was wrong with it
        message: String,
    },

    /// Text that does not parse as a record id
    #[error("invalid record id '{value}': {reason}")]
    InvalidId {
        /// Offending text
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Database or collection name unusable by the backend
    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// Caller tried to store a field under the id key
    #[error("reserved key '{0}' cannot be stored as a field")]
    ReservedKey(String),
}

impl StoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create corruption error for a namespace
    pub fn corrupt(namespace: impl ToString, message: impl Into<String>) -> Self {
        Self::Corrupt {
            namespace: namespace.to_string(),
            message: message.into(),
        }
    }
}
