//! JSON-file document store
//!
//! Layout: `<root>/<database>/<collection>.json`, each file a JSON array of
//! documents with their id under `_id`. Every mutation rewrites the whole
//! collection file through a temp file and an atomic rename.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::document::{Document, Fields};
use crate::error::StoreError;
use crate::filter::Filter;
use crate::id::RecordId;
use crate::store::{check_fields, DocumentStore, Namespace};

const COLLECTION_EXT: &str = "json";

type Collection = IndexMap<RecordId, Fields>;

/// Store persisting each collection as one JSON file
#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `root`, creating the directory if needed
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io_error(&root, e))?;
        debug!(root = %root.display(), "opened json file store");
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `ns`
    ///
    /// # Errors
    /// [`StoreError::InvalidNamespace`] if either name could escape the root.
    pub fn collection_path(&self, ns: &Namespace) -> Result<PathBuf, StoreError> {
        validate_component(&ns.database)?;
        validate_component(&ns.collection)?;
        Ok(self
            .root
            .join(&ns.database)
            .join(format!("{}.{COLLECTION_EXT}", ns.collection)))
    }

    fn load(&self, ns: &Namespace) -> Result<Collection, StoreError> {
        let path = self.collection_path(ns)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Collection::new()),
            Err(e) => return Err(StoreError::io_error(&path, e)),
        };
        let value: Value = serde_json::from_slice(&bytes)?;
        let Value::Array(items) = value else {
            return Err(StoreError::corrupt(ns, "expected a JSON array of documents"));
        };
        let mut docs = Collection::with_capacity(items.len());
        for item in items {
            let doc = Document::from_json(item)?;
            let id = doc.id();
            if docs.insert(id, doc.into_fields()).is_some() {
                return Err(StoreError::corrupt(ns, format!("duplicate id {id}")));
            }
        }
        Ok(docs)
    }

    fn save(&self, ns: &Namespace, docs: &Collection) -> Result<(), StoreError> {
        let path = self.collection_path(ns)?;
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::InvalidNamespace(ns.to_string()))?;
        fs::create_dir_all(dir).map_err(|e| StoreError::io_error(dir, e))?;

        let items: Vec<Value> = docs
            .iter()
            .map(|(id, fields)| Document::new(*id, fields.clone()).to_json())
            .collect();
        let bytes = serde_json::to_vec_pretty(&Value::Array(items))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io_error(dir, e))?;
        tmp.write_all(&bytes)
            .map_err(|e| StoreError::io_error(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| StoreError::io_error(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io_error(&path, e.error))?;
        Ok(())
    }

    fn mutate<T>(
        &self,
        ns: &Namespace,
        f: impl FnOnce(&mut Collection) -> (T, bool),
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock();
        let mut docs = self.load(ns)?;
        let (out, dirty) = f(&mut docs);
        if dirty {
            self.save(ns, &docs)?;
        }
        Ok(out)
    }
}

impl DocumentStore for JsonFileStore {
    fn find(&self, ns: &Namespace, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .load(ns)?
            .into_iter()
            .map(|(id, fields)| Document::new(id, fields))
            .filter(|doc| filter.matches(doc))
            .collect())
    }

    fn insert_one(&self, ns: &Namespace, fields: Fields) -> Result<RecordId, StoreError> {
        check_fields(&fields)?;
        let id = RecordId::new();
        self.mutate(ns, |docs| {
            docs.insert(id, fields);
            ((), true)
        })?;
        Ok(id)
    }

    fn replace_one(
        &self,
        ns: &Namespace,
        id: RecordId,
        fields: Fields,
    ) -> Result<bool, StoreError> {
        check_fields(&fields)?;
        self.mutate(ns, |docs| match docs.get_mut(&id) {
            Some(slot) => {
                *slot = fields;
                (true, true)
            }
            None => (false, false),
        })
    }

    fn delete_one(&self, ns: &Namespace, id: RecordId) -> Result<bool, StoreError> {
        self.mutate(ns, |docs| {
            let removed = docs.shift_remove(&id).is_some();
            (removed, removed)
        })
    }
}

fn validate_component(name: &str) -> Result<(), StoreError> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if bad {
        return Err(StoreError::InvalidNamespace(name.to_string()));
    }
    Ok(())
}
