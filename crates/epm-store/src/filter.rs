//! Exact-match query filters

use serde_json::Value;

use crate::document::{Document, Fields};
use crate::id::RecordId;

/// Conjunction of exact-equality constraints
///
/// A document matches when every listed field is present with an equal
/// value. A `null` constraint also matches a document that lacks the field
/// entirely, the way document databases treat missing keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    id: Option<RecordId>,
    fields: Fields,
}

impl Filter {
    /// Filter matching every document
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter on the record id only
    #[inline]
    #[must_use]
    pub fn by_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            fields: Fields::new(),
        }
    }

    /// Filter requiring every given field to match
    #[inline]
    #[must_use]
    pub fn matching(fields: Fields) -> Self {
        Self { id: None, fields }
    }

    /// Add a single field constraint
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    /// Id constraint, if any
    #[inline]
    #[must_use]
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Field constraints
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Check a document against this filter
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(id) = self.id {
            if doc.id() != id {
                return false;
            }
        }
        self.fields.iter().all(|(key, expected)| match doc.get(key) {
            Some(actual) => actual == expected,
            None => expected.is_null(),
        })
    }
}
