//! Testing utilities for EPM workspace
//!
//! Shared schemas, store handles and record builders.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::sync::Arc;

use epm_params::{ParamSchema, ParameterRecord, ParamsError, SchemaDef};
use epm_store::{DocumentStore, Fields, Filter, MemoryStore, Namespace};
use serde_json::{json, Value};

pub const PROJECT: &str = "Dummy";

/// Two integer fields, nothing ignored
#[derive(Debug, Clone, Copy)]
pub struct DummyParams;

impl ParamSchema for DummyParams {
    fn class_name(&self) -> &str {
        "DummyParams"
    }

    fn project_name(&self) -> &str {
        PROJECT
    }

    fn default_params(&self) -> Fields {
        fields(json!({"a": 1, "b": 2}))
    }

    fn ignore_hash_keys(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// Same collection as [`DummyParams`] after a field `c` was added
#[derive(Debug, Clone, Copy)]
pub struct DummyParamsWithC;

impl ParamSchema for DummyParamsWithC {
    fn class_name(&self) -> &str {
        "DummyParams"
    }

    fn project_name(&self) -> &str {
        PROJECT
    }

    fn default_params(&self) -> Fields {
        fields(json!({"a": 1, "b": 2, "c": 3}))
    }

    fn ignore_hash_keys(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// Schema with an ignored free-text field `d`
pub fn noted_schema() -> SchemaDef {
    SchemaDef::new(PROJECT, "NotedParams")
        .with_default("a", json!(1))
        .with_default("b", json!(2))
        .with_default("d", json!("4"))
        .ignoring("d")
}

/// Same as [`noted_schema`] but with `d` still part of identity
pub fn noted_schema_hashing_d() -> SchemaDef {
    SchemaDef::new(PROJECT, "NotedParams")
        .with_default("a", json!(1))
        .with_default("b", json!(2))
        .with_default("d", json!("4"))
}

pub fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn memory_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

/// Open with auto-confirm and the given overrides
pub fn open_with<S: ParamSchema>(
    schema: S,
    store: &Arc<dyn DocumentStore>,
    overrides: Value,
) -> Result<ParameterRecord<S>, ParamsError> {
    ParameterRecord::builder(schema)
        .overrides(fields(overrides))
        .auto_confirm()
        .open(Arc::clone(store))
}

/// Open with auto-confirm and a usertag
pub fn open_tagged<S: ParamSchema>(
    schema: S,
    store: &Arc<dyn DocumentStore>,
    usertag: &str,
    overrides: Value,
) -> Result<ParameterRecord<S>, ParamsError> {
    ParameterRecord::builder(schema)
        .overrides(fields(overrides))
        .usertag(usertag)
        .auto_confirm()
        .open(Arc::clone(store))
}

pub fn count(store: &Arc<dyn DocumentStore>, ns: &Namespace) -> usize {
    store.count(ns).unwrap()
}

pub fn all_fields(store: &Arc<dyn DocumentStore>, ns: &Namespace) -> Vec<Fields> {
    store
        .find(ns, &Filter::all())
        .unwrap()
        .into_iter()
        .map(epm_store::Document::into_fields)
        .collect()
}
