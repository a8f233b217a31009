//! Schema reconciliation
//!
//! Aligns stored documents with a class's current declared defaults.
//! [`SchemaDiff::between`] is the pure part: it compares key sets. The
//! [`reconcile`] step applies the diff against the store, asking the
//! injected [`Confirm`] policy before touching any document.
//!
//! When fields were both added and removed, removals run first and every
//! removed field is checked for uniform values before anything is mutated.

use std::collections::BTreeSet;

use epm_store::{Document, DocumentStore, Fields, Filter, Namespace, ID_KEY};
use serde_json::Value;
use tracing::{info, warn};

use crate::confirm::Confirm;
use crate::error::ParamsError;

/// Field-level difference between current and stored schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Declared now, absent from stored documents
    pub added: Vec<String>,
    /// Present in stored documents, no longer declared
    pub removed: Vec<String>,
}

/// Shape of a schema drift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftKind {
    /// Key sets are equal
    Unchanged,
    /// Stored keys are a strict subset of current keys
    Added,
    /// Stored keys are a strict superset of current keys
    Removed,
    /// Neither is a subset of the other
    Mixed,
}

impl SchemaDiff {
    /// Compare the current key set with a stored document's key set
    #[must_use]
    pub fn between(current: &BTreeSet<String>, stored: &BTreeSet<String>) -> Self {
        Self {
            added: current.difference(stored).cloned().collect(),
            removed: stored.difference(current).cloned().collect(),
        }
    }

    /// No drift at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Classify the drift
    #[must_use]
    pub fn kind(&self) -> DriftKind {
        match (self.added.is_empty(), self.removed.is_empty()) {
            (true, true) => DriftKind::Unchanged,
            (false, true) => DriftKind::Added,
            (true, false) => DriftKind::Removed,
            (false, false) => DriftKind::Mixed,
        }
    }
}

/// What a reconciliation run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Fields back-filled into existing documents
    pub added: Vec<String>,
    /// Fields deleted from existing documents
    pub removed: Vec<String>,
    /// Changes the confirmation policy turned down
    pub declined: Vec<String>,
    /// Document writes performed
    pub documents_updated: usize,
}

impl ReconcileReport {
    /// Nothing was changed and nothing was declined
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.declined.is_empty()
    }

    /// Stored documents may still disagree with the current schema
    #[inline]
    #[must_use]
    pub fn left_inconsistent(&self) -> bool {
        !self.declined.is_empty()
    }
}

/// Reconcile the documents of `ns` against `reference`
///
/// `reference` is the field map a freshly stored document would have; its
/// keys plus the id key form the current schema. Each added field is
/// back-filled with its reference value into documents lacking it.
///
/// # Errors
/// [`ParamsError::UnsafeSchemaChange`] when a field to remove does not hold
/// the same value in every document; confirmation and store errors
/// propagate.
pub fn reconcile(
    store: &dyn DocumentStore,
    ns: &Namespace,
    reference: &Fields,
    confirm: &dyn Confirm,
) -> Result<ReconcileReport, ParamsError> {
    let mut report = ReconcileReport::default();

    let Some(sample) = store.find_one(ns, &Filter::all())? else {
        return Ok(report);
    };

    let mut current: BTreeSet<String> = reference.keys().cloned().collect();
    current.insert(ID_KEY.to_string());
    let diff = SchemaDiff::between(&current, &sample.key_set());
    if diff.is_empty() {
        return Ok(report);
    }

    if !diff.removed.is_empty() {
        info!(namespace = %ns, fields = ?diff.removed, "default parameters were deleted");
        let docs = store.find(ns, &Filter::all())?;
        for field in &diff.removed {
            check_uniform(ns, &docs, field)?;
        }
        for field in &diff.removed {
            let prompt = format!("For all entries in {ns}, deleting key {field}");
            if confirm.confirm(&prompt)? {
                report.documents_updated += remove_field(store, ns, field)?;
                report.removed.push(field.clone());
            } else {
                warn!(namespace = %ns, field = %field, "field removal declined");
                report.declined.push(field.clone());
            }
        }
    }

    if !diff.added.is_empty() {
        info!(namespace = %ns, fields = ?diff.added, "new default parameters found");
        for field in &diff.added {
            let value = reference.get(field).cloned().unwrap_or(Value::Null);
            let prompt = format!("Setting all entries in {ns} with value {value} for key {field}");
            if confirm.confirm(&prompt)? {
                report.documents_updated += backfill_field(store, ns, field, &value)?;
                report.added.push(field.clone());
            } else {
                warn!(namespace = %ns, field = %field, "field back-fill declined");
                report.declined.push(field.clone());
            }
        }
    }

    info!(
        namespace = %ns,
        added = report.added.len(),
        removed = report.removed.len(),
        declined = report.declined.len(),
        updated = report.documents_updated,
        "reconciliation finished"
    );
    Ok(report)
}

fn check_uniform(ns: &Namespace, docs: &[Document], field: &str) -> Result<(), ParamsError> {
    let mut values = docs.iter().map(|d| d.get(field));
    let Some(first) = values.next() else {
        return Ok(());
    };
    if values.all(|v| v == first) {
        return Ok(());
    }
    Err(ParamsError::UnsafeSchemaChange {
        namespace: ns.to_string(),
        field: field.to_string(),
        documents: docs.len(),
    })
}

fn remove_field(store: &dyn DocumentStore, ns: &Namespace, field: &str) -> Result<usize, ParamsError> {
    let mut updated = 0;
    for doc in store.find(ns, &Filter::all())? {
        if doc.get(field).is_none() {
            continue;
        }
        let id = doc.id();
        let mut fields = doc.into_fields();
        fields.remove(field);
        if store.replace_one(ns, id, fields)? {
            updated += 1;
        }
    }
    Ok(updated)
}

fn backfill_field(
    store: &dyn DocumentStore,
    ns: &Namespace,
    field: &str,
    value: &Value,
) -> Result<usize, ParamsError> {
    let mut updated = 0;
    for doc in store.find(ns, &Filter::all())? {
        if doc.get(field).is_some() {
            continue;
        }
        let id = doc.id();
        let mut fields = doc.into_fields();
        fields.insert(field.to_string(), value.clone());
        if store.replace_one(ns, id, fields)? {
            updated += 1;
        }
    }
    Ok(updated)
}
