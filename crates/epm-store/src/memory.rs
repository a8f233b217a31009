//! In-memory document store

use std::collections::HashMap;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::filter::Filter;
use crate::id::RecordId;
use crate::store::{check_fields, DocumentStore, Namespace};

type Collection = IndexMap<RecordId, Fields>;

/// Process-local store, insertion order preserved per collection
///
/// Nothing survives the process. Used by tests and by the `memory`
/// backend in configuration.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<Namespace, Collection>>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaces that currently hold at least one document
    #[must_use]
    pub fn namespaces(&self) -> Vec<Namespace> {
        let guard = self.collections.lock();
        let mut out: Vec<_> = guard
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(ns, _)| ns.clone())
            .collect();
        out.sort();
        out
    }
}

impl DocumentStore for MemoryStore {
    fn find(&self, ns: &Namespace, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.lock();
        let Some(docs) = guard.get(ns) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .map(|(id, fields)| Document::new(*id, fields.clone()))
            .filter(|doc| filter.matches(doc))
            .collect())
    }

    fn insert_one(&self, ns: &Namespace, fields: Fields) -> Result<RecordId, StoreError> {
        check_fields(&fields)?;
        let id = RecordId::new();
        self.collections
            .lock()
            .entry(ns.clone())
            .or_default()
            .insert(id, fields);
        Ok(id)
    }

    fn replace_one(
        &self,
        ns: &Namespace,
        id: RecordId,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        check_fields(&fields)?;
        let mut guard = self.collections.lock();
        match guard.get_mut(ns).and_then(|docs| docs.get_mut(&id)) {
            Some(slot) => {
                *slot = fields;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_one(&self, ns: &Namespace, id: RecordId) -> Result<bool, StoreError> {
        let mut guard = self.collections.lock();
        Ok(guard
            .get_mut(ns)
            .and_then(|docs| docs.shift_remove(&id))
            .is_some())
    }

    fn count(&self, ns: &Namespace) -> Result<usize, StoreError> {
        Ok(self.collections.lock().get(ns).map_or(0, IndexMap::len))
    }
}
