//! The document store capability

use std::fmt::{self, Display, Formatter};

use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::filter::Filter;
use crate::id::RecordId;

/// Database (project) plus collection (class) a document lives in
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Namespace {
    /// Top-level database, one per project
    pub database: String,
    /// Collection, one per parameter class
    pub collection: String,
}

impl Namespace {
    /// Create namespace
    #[inline]
    #[must_use]
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// Blocking access to a schemaless document store
///
/// Injected into every parameter record. Implementations assign
/// [`RecordId`]s on insert and never change them afterwards. No
/// transactions are offered: callers doing read-then-write sequences race
/// with other writers.
pub trait DocumentStore: Send + Sync {
    /// Return every document in `ns` matching `filter`, in insertion order
    ///
    /// # Errors
    /// Backend failures.
    fn find(&self, ns: &Namespace, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    /// Insert a new document and return its assigned id
    ///
    /// # Errors
    /// [`StoreError::ReservedKey`] if `fields` carries the id key, or a
    /// backend failure.
    fn insert_one(&self, ns: &Namespace, fields: Fields) -> Result<RecordId, StoreError>;

    /// Replace the fields of document `id`, keeping its id
    ///
    /// Returns `false` when no such document exists.
    ///
    /// # Errors
    /// Backend failures.
    fn replace_one(&self, ns: &Namespace, id: RecordId, fields: Fields)
        -> Result<bool, StoreError>;

    /// Delete document `id`; returns `false` when it did not exist
    ///
    /// # Errors
    /// Backend failures.
    fn delete_one(&self, ns: &Namespace, id: RecordId) -> Result<bool, StoreError>;

    /// First document matching `filter`
    ///
    /// # Errors
    /// Backend failures.
    fn find_one(&self, ns: &Namespace, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.find(ns, filter)?.into_iter().next())
    }

    /// Number of documents in `ns`
    ///
    /// # Errors
    /// Backend failures.
    fn count(&self, ns: &Namespace) -> Result<usize, StoreError> {
        Ok(self.find(ns, &Filter::all())?.len())
    }
}

/// Reject field maps that try to smuggle in an id
pub(crate) fn check_fields(fields: &Fields) -> Result<(), StoreError> {
    if fields.contains_key(crate::document::ID_KEY) {
        return Err(StoreError::ReservedKey(crate::document::ID_KEY.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_display() {
        let ns = Namespace::new("Dummy", "DummyParams");
        assert_eq!(ns.to_string(), "Dummy.DummyParams");
    }

    #[test]
    fn check_fields_rejects_id() {
        let mut fields = Fields::new();
        fields.insert("_id".to_string(), serde_json::json!("x"));
        assert!(matches!(check_fields(&fields), Err(StoreError::ReservedKey(_))));
        assert!(check_fields(&Fields::new()).is_ok());
    }
}
