//! Duplicate scans
//!
//! Debugging aids for collections edited behind the record's back. The
//! insert path in [`ParameterRecord::hash_name`](crate::ParameterRecord::hash_name)
//! never creates duplicates on its own.

use std::collections::HashMap;

use epm_store::{Document, DocumentStore, Filter, Namespace, RecordId};
use tracing::warn;

use crate::error::ParamsError;
use crate::fingerprint::Fingerprint;

/// Two documents with identical non-id fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicatePair {
    /// Earlier document in collection order
    pub original: RecordId,
    /// Later document holding the same fields
    pub duplicate: RecordId,
    /// Fingerprint shared by both documents' fields
    pub fingerprint: Fingerprint,
}

/// Every pair of documents whose fields share a fingerprint
///
/// Documents are bucketed by [`Fingerprint::of_fields`]; each bucket of
/// `k` documents yields all `k * (k - 1) / 2` pairs. Pairs come out
/// ordered by the position of the original, then of the duplicate.
#[must_use]
pub fn find_duplicates(docs: &[Document]) -> Vec<DuplicatePair> {
    let mut buckets: HashMap<Fingerprint, Vec<usize>> = HashMap::new();
    for (pos, doc) in docs.iter().enumerate() {
        buckets
            .entry(Fingerprint::of_fields(doc.fields()))
            .or_default()
            .push(pos);
    }

    let mut pairs: Vec<(usize, usize, Fingerprint)> = Vec::new();
    for (fingerprint, positions) in &buckets {
        for (i, &a) in positions.iter().enumerate() {
            for &b in &positions[i + 1..] {
                pairs.push((a, b, *fingerprint));
            }
        }
    }
    pairs.sort_unstable_by_key(|&(a, b, _)| (a, b));
    pairs
        .into_iter()
        .map(|(a, b, fingerprint)| DuplicatePair {
            original: docs[a].id(),
            duplicate: docs[b].id(),
            fingerprint,
        })
        .collect()
}

/// Delete one duplicate at a time until the collection has none
///
/// Returns the deleted ids in deletion order.
///
/// # Errors
/// Store failures.
pub fn remove_duplicates(
    store: &dyn DocumentStore,
    ns: &Namespace,
) -> Result<Vec<RecordId>, ParamsError> {
    let mut removed = Vec::new();
    loop {
        let docs = store.find(ns, &Filter::all())?;
        let Some(pair) = find_duplicates(&docs).into_iter().next() else {
            break;
        };
        warn!(
            namespace = %ns,
            original = %pair.original,
            duplicate = %pair.duplicate,
            fingerprint = %pair.fingerprint.short(),
            "removing duplicate record"
        );
        if !store.delete_one(ns, pair.duplicate)? {
            return Err(ParamsError::not_found(
                ns,
                format!("duplicate record {}", pair.duplicate),
                0,
            ));
        }
        removed.push(pair.duplicate);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use epm_store::{Fields, MemoryStore};
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn no_duplicates_in_distinct_documents() {
        let docs = vec![
            Document::new(RecordId::new(), fields(json!({"a": 1}))),
            Document::new(RecordId::new(), fields(json!({"a": 2}))),
        ];
        assert!(find_duplicates(&docs).is_empty());
    }

    #[test]
    fn every_equal_pair_is_reported() {
        let same = fields(json!({"a": 1}));
        let docs: Vec<_> = (0..3)
            .map(|_| Document::new(RecordId::new(), same.clone()))
            .collect();
        let pairs = find_duplicates(&docs);
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].original, docs[0].id());
        assert_eq!(pairs[0].duplicate, docs[1].id());
        assert_eq!(pairs[1].duplicate, docs[2].id());
        assert_eq!(pairs[2].original, docs[1].id());
        assert_eq!(pairs[0].fingerprint, Fingerprint::of_fields(&same));
    }

    #[test]
    fn key_order_does_not_hide_a_duplicate() {
        let mut first = Fields::new();
        first.insert("a".into(), json!(1));
        first.insert("b".into(), json!({"x": 1, "y": 2}));
        let mut second = Fields::new();
        second.insert("b".into(), json!({"y": 2, "x": 1}));
        second.insert("a".into(), json!(1));
        let docs = vec![
            Document::new(RecordId::new(), first),
            Document::new(RecordId::new(), fields(json!({"a": 2}))),
            Document::new(RecordId::new(), second),
        ];
        let pairs = find_duplicates(&docs);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].original, docs[0].id());
        assert_eq!(pairs[0].duplicate, docs[2].id());
    }

    #[test]
    fn remove_until_clean() {
        let store = MemoryStore::new();
        let ns = Namespace::new("p", "C");
        let keep = store.insert_one(&ns, fields(json!({"a": 1}))).unwrap();
        store.insert_one(&ns, fields(json!({"a": 1}))).unwrap();
        store.insert_one(&ns, fields(json!({"a": 1}))).unwrap();
        let other = store.insert_one(&ns, fields(json!({"a": 2}))).unwrap();

        let removed = remove_duplicates(&store, &ns).unwrap();
        assert_eq!(removed.len(), 2);

        let left: Vec<_> = store
            .find(&ns, &Filter::all())
            .unwrap()
            .iter()
            .map(Document::id)
            .collect();
        assert_eq!(left, vec![keep, other]);
    }
}
