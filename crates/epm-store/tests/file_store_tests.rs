//! JsonFileStore Tests
//!
//! Persistence, reopen and corruption handling for the file backend.

use epm_store::{DocumentStore, Fields, Filter, JsonFileStore, Namespace, StoreError};
use pretty_assertions::assert_eq;
use serde_json::json;

fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap()
}

fn ns() -> Namespace {
    Namespace::new("Dummy", "DummyParams")
}

#[test]
fn test_documents_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let store = JsonFileStore::open(dir.path()).unwrap();
        store.insert_one(&ns(), fields(json!({"a": 1, "b": 2}))).unwrap()
    };

    let store = JsonFileStore::open(dir.path()).unwrap();
    let docs = store.find(&ns(), &Filter::all()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), id);
    assert_eq!(docs[0].fields(), &fields(json!({"a": 1, "b": 2})));
}

#[test]
fn test_collection_file_layout() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.insert_one(&ns(), fields(json!({"a": 1}))).unwrap();

    let path = dir.path().join("Dummy").join("DummyParams.json");
    assert!(path.exists());
    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
    assert!(raw.as_array().unwrap()[0].get("_id").is_some());
}

#[test]
fn test_missing_collection_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    assert_eq!(store.count(&ns()).unwrap(), 0);
    assert!(store.find_one(&ns(), &Filter::all()).unwrap().is_none());
}

#[test]
fn test_replace_and_delete_persist() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let keep = store.insert_one(&ns(), fields(json!({"a": 1}))).unwrap();
    let gone = store.insert_one(&ns(), fields(json!({"a": 2}))).unwrap();

    assert!(store.replace_one(&ns(), keep, fields(json!({"a": 10}))).unwrap());
    assert!(store.delete_one(&ns(), gone).unwrap());

    let reopened = JsonFileStore::open(dir.path()).unwrap();
    let docs = reopened.find(&ns(), &Filter::all()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), keep);
    assert_eq!(docs[0].get("a"), Some(&json!(10)));
}

#[test]
fn test_filter_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    store.insert_one(&ns(), fields(json!({"a": 1, "usertag": null}))).unwrap();
    let tagged = store.insert_one(&ns(), fields(json!({"a": 1, "usertag": "best"}))).unwrap();

    let found = store
        .find(&ns(), &Filter::all().with_field("usertag", json!("best")))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), tagged);
}

#[test]
fn test_corrupt_collection_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let path = store.collection_path(&ns()).unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{\"not\": \"an array\"}").unwrap();

    let result = store.find(&ns(), &Filter::all());
    assert!(matches!(result, Err(StoreError::Corrupt { .. })));
}

#[test]
fn test_unparseable_collection_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let path = store.collection_path(&ns()).unwrap();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"[{").unwrap();

    let result = store.count(&ns());
    assert!(matches!(result, Err(StoreError::Serialization(_))));
}

#[test]
fn test_namespace_cannot_escape_root() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let evil = Namespace::new("..", "passwd");
    let result = store.insert_one(&evil, Fields::new());
    assert!(matches!(result, Err(StoreError::InvalidNamespace(_))));
}
