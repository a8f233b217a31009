//! Error types for parameter records
//!
//! Provides error handling for:
//! - Construction (unknown or reserved override fields)
//! - Schema reconciliation (unsafe field removal)
//! - Content-addressed lookup (duplicate records and usertags)
//! - Id/usertag lookups and the confirmation channel

use epm_store::{RecordId, StoreError};

/// Main parameter record error type
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    /// Override key not declared in the defaults, or a reserved name
    #[error("invalid field '{field}' for {class}: {reason}")]
    InvalidField {
        /// Parameter class
        class: String,
        /// Rejected field name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Removing a field whose stored values differ would discard information
    #[error("unsafe schema change in {namespace}: field '{field}' is not identical across {documents} documents")]
    UnsafeSchemaChange {
        /// `database.collection`
        namespace: String,
        /// Field that would be removed
        field: String,
        /// Documents inspected
        documents: usize,
    },

    /// More than one document holds the same hashable fields
    #[error("duplicate records in {namespace}: {ids:?}")]
    DuplicateRecord {
        /// `database.collection`
        namespace: String,
        /// Every matching document
        ids: Vec<RecordId>,
    },

    /// Usertag already names a different value set
    #[error("usertag '{usertag}' in {namespace} already names record {existing}")]
    DuplicateUsertag {
        /// `database.collection`
        namespace: String,
        /// Requested tag
        usertag: String,
        /// Document already carrying it
        existing: RecordId,
    },

    /// Lookup matched zero or an unexpected number of documents
    #[error("{what} in {namespace}: expected exactly one document, found {found}")]
    NotFound {
        /// `database.collection`
        namespace: String,
        /// Description of the lookup
        what: String,
        /// Number of documents matched
        found: usize,
    },

    /// Confirmation channel answered neither yes nor no
    #[error("invalid response '{0}', enter Y/N")]
    InvalidResponse(String),

    /// Schema definition could not be parsed
    #[error("schema definition error: {0}")]
    SchemaDefinition(String),

    /// Document store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Terminal IO failure while asking for confirmation
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParamsError {
    /// Create invalid field error
    pub fn invalid_field(
        class: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            class: class.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create not found error
    pub fn not_found(namespace: impl ToString, what: impl Into<String>, found: usize) -> Self {
        Self::NotFound {
            namespace: namespace.to_string(),
            what: what.into(),
            found,
        }
    }

    /// Check if the store itself failed, as opposed to a bookkeeping rule
    #[inline]
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
