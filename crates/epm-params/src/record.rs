//! Parameter records
//!
//! A [`ParameterRecord`] binds a [`ParamSchema`], caller overrides and an
//! injected [`DocumentStore`]. Opening one validates the overrides and
//! reconciles the collection's stored schema; afterwards
//! [`ParameterRecord::hash_name`] maps the record's hashable fields to a
//! stable [`RecordId`].

use std::sync::Arc;

use epm_store::{Document, DocumentStore, Fields, Filter, Namespace, RecordId};
use serde_json::Value;
use tracing::{debug, info};

use crate::confirm::{AlwaysYes, Confirm, TerminalConfirm};
use crate::duplicates::{self, DuplicatePair};
use crate::error::ParamsError;
use crate::fingerprint::Fingerprint;
use crate::reconcile::{reconcile, ReconcileReport};
use crate::schema::{validate_defaults, ParamSchema, NAME_KEY, RESERVED_KEYS, USERTAG_KEY};

/// Builder collecting overrides before a record is opened
pub struct RecordBuilder<S> {
    schema: S,
    usertag: Option<String>,
    overrides: Fields,
    confirm: Box<dyn Confirm>,
}

impl<S: ParamSchema> RecordBuilder<S> {
    fn new(schema: S) -> Self {
        Self {
            schema,
            usertag: None,
            overrides: Fields::new(),
            confirm: Box::new(TerminalConfirm::stdio()),
        }
    }

    /// Attach a human label
    #[must_use]
    pub fn usertag(mut self, tag: impl Into<String>) -> Self {
        self.usertag = Some(tag.into());
        self
    }

    /// Override one default
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Override several defaults
    #[must_use]
    pub fn overrides(mut self, fields: Fields) -> Self {
        self.overrides.extend(fields);
        self
    }

    /// Confirmation policy for schema changes (default: terminal prompt)
    #[must_use]
    pub fn confirm(mut self, confirm: impl Confirm + 'static) -> Self {
        self.confirm = Box::new(confirm);
        self
    }

    /// Boxed confirmation policy, e.g. from configuration
    #[must_use]
    pub fn confirm_boxed(mut self, confirm: Box<dyn Confirm>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Skip all prompts
    #[must_use]
    pub fn auto_confirm(self) -> Self {
        self.confirm(AlwaysYes)
    }

    /// Validate overrides, reconcile the collection and open the record
    ///
    /// # Errors
    /// - [`ParamsError::InvalidField`] for reserved or undeclared overrides
    /// - [`ParamsError::UnsafeSchemaChange`] from reconciliation
    /// - confirmation and store errors
    pub fn open(self, store: Arc<dyn DocumentStore>) -> Result<ParameterRecord<S>, ParamsError> {
        let Self {
            schema,
            usertag,
            overrides,
            confirm,
        } = self;

        validate_defaults(&schema)?;
        let mut params = schema.default_params();
        for (key, value) in overrides {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(ParamsError::invalid_field(
                    schema.class_name(),
                    key,
                    "reserved names cannot be overridden",
                ));
            }
            if !params.contains_key(&key) {
                return Err(ParamsError::invalid_field(
                    schema.class_name(),
                    key,
                    "not a default parameter",
                ));
            }
            params.insert(key, value);
        }

        let namespace = Namespace::new(schema.project_name(), schema.class_name());
        let mut record = ParameterRecord {
            schema,
            store,
            namespace,
            params,
            usertag,
            report: ReconcileReport::default(),
        };

        debug!(namespace = %record.namespace, "checking schema consistency");
        record.report = reconcile(
            record.store.as_ref(),
            &record.namespace,
            &record.stored_schema(),
            confirm.as_ref(),
        )?;
        Ok(record)
    }
}

/// A named parameter set persisted in its class's collection
pub struct ParameterRecord<S> {
    schema: S,
    store: Arc<dyn DocumentStore>,
    namespace: Namespace,
    params: Fields,
    usertag: Option<String>,
    report: ReconcileReport,
}

impl<S: ParamSchema> ParameterRecord<S> {
    /// Start building a record for `schema`
    #[must_use]
    pub fn builder(schema: S) -> RecordBuilder<S> {
        RecordBuilder::new(schema)
    }

    /// Open with defaults only and auto-confirmed reconciliation
    ///
    /// # Errors
    /// See [`RecordBuilder::open`].
    pub fn open_default(schema: S, store: Arc<dyn DocumentStore>) -> Result<Self, ParamsError> {
        Self::builder(schema).auto_confirm().open(store)
    }

    /// Schema this record was built from
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Collection name
    #[inline]
    #[must_use]
    pub fn class_name(&self) -> &str {
        self.schema.class_name()
    }

    /// Database name
    #[inline]
    #[must_use]
    pub fn project_name(&self) -> &str {
        self.schema.project_name()
    }

    /// Database and collection this record lives in
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Human label, if any
    #[inline]
    #[must_use]
    pub fn usertag(&self) -> Option<&str> {
        self.usertag.as_deref()
    }

    /// Outcome of the reconciliation run at open time
    #[inline]
    #[must_use]
    pub fn reconcile_report(&self) -> &ReconcileReport {
        &self.report
    }

    /// Effective fields plus `name` and `usertag`
    #[must_use]
    pub fn params(&self) -> Fields {
        let mut params = self.params.clone();
        params.insert(USERTAG_KEY.to_string(), self.usertag_value());
        params.insert(NAME_KEY.to_string(), Value::String(self.class_name().to_string()));
        params
    }

    /// [`params`](Self::params) without the ignored keys
    #[must_use]
    pub fn hashable_params(&self) -> Fields {
        let mut params = self.params();
        for key in self.schema.ignore_hash_keys() {
            params.remove(&key);
        }
        params
    }

    /// Declared defaults with `name` and this record's `usertag`, without
    /// the ignored keys
    ///
    /// This is the shape every stored document of the class must have.
    #[must_use]
    pub fn default_hashable_params(&self) -> Fields {
        let mut params = self.schema.default_params();
        params.insert(NAME_KEY.to_string(), Value::String(self.class_name().to_string()));
        params.insert(USERTAG_KEY.to_string(), self.usertag_value());
        for key in self.schema.ignore_hash_keys() {
            params.remove(&key);
        }
        params
    }

    /// Field map a freshly stored default document would hold
    ///
    /// Same keys as [`default_hashable_params`](Self::default_hashable_params)
    /// but with a null `usertag`: back-filling a record's own tag into
    /// older documents would bind one tag to many value sets.
    fn stored_schema(&self) -> Fields {
        let mut reference = self.default_hashable_params();
        reference.insert(USERTAG_KEY.to_string(), Value::Null);
        reference
    }

    /// [`params`](Self::params) without `name` and `usertag`
    #[must_use]
    pub fn params_no_reserved(&self) -> Fields {
        self.params.clone()
    }

    /// Blake3 fingerprint of [`hashable_params`](Self::hashable_params)
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of_fields(&self.hashable_params())
    }

    /// Identifier of the document holding this record's hashable fields,
    /// inserting it on first use
    ///
    /// # Errors
    /// - [`ParamsError::DuplicateUsertag`] when the usertag already names a
    ///   different value set
    /// - [`ParamsError::DuplicateRecord`] when several documents match
    /// - store errors
    pub fn hash_name(&self) -> Result<RecordId, ParamsError> {
        let hashable = self.hashable_params();
        let matches = self
            .store
            .find(&self.namespace, &Filter::matching(hashable.clone()))?;

        match matches.as_slice() {
            [] => {
                if let Some(tag) = &self.usertag {
                    let tagged = self.store.find(
                        &self.namespace,
                        &Filter::all().with_field(USERTAG_KEY, Value::String(tag.clone())),
                    )?;
                    if let Some(existing) = tagged.first() {
                        return Err(ParamsError::DuplicateUsertag {
                            namespace: self.namespace.to_string(),
                            usertag: tag.clone(),
                            existing: existing.id(),
                        });
                    }
                }
                let id = self.store.insert_one(&self.namespace, hashable)?;
                info!(
                    namespace = %self.namespace,
                    id = %id,
                    fingerprint = %self.fingerprint().short(),
                    "inserted parameter record"
                );
                Ok(id)
            }
            [found] => {
                debug!(namespace = %self.namespace, id = %found.id(), "parameter record exists");
                Ok(found.id())
            }
            many => Err(ParamsError::DuplicateRecord {
                namespace: self.namespace.to_string(),
                ids: many.iter().map(Document::id).collect(),
            }),
        }
    }

    /// Every document with this id (zero or one in a healthy store)
    ///
    /// # Errors
    /// Store errors.
    pub fn find_by_id(&self, id: RecordId) -> Result<Vec<Document>, ParamsError> {
        Ok(self.store.find(&self.namespace, &Filter::by_id(id))?)
    }

    /// The single document with this id
    ///
    /// # Errors
    /// [`ParamsError::NotFound`] unless exactly one document matches.
    pub fn from_id(&self, id: RecordId) -> Result<Document, ParamsError> {
        exactly_one(&self.namespace, format!("record {id}"), self.find_by_id(id)?)
    }

    /// The single document carrying `usertag`
    ///
    /// # Errors
    /// [`ParamsError::NotFound`] unless exactly one document matches.
    pub fn find_by_usertag(&self, usertag: &str) -> Result<Document, ParamsError> {
        let docs = self.store.find(
            &self.namespace,
            &Filter::all().with_field(USERTAG_KEY, Value::String(usertag.to_string())),
        )?;
        exactly_one(&self.namespace, format!("usertag '{usertag}'"), docs)
    }

    /// Ids of every document in the collection
    ///
    /// # Errors
    /// Store errors.
    pub fn get_all_ids(&self) -> Result<Vec<RecordId>, ParamsError> {
        Ok(self
            .store
            .find(&self.namespace, &Filter::all())?
            .iter()
            .map(Document::id)
            .collect())
    }

    /// Delete the document with this id after confirmation
    ///
    /// Returns the number of documents deleted; a declined confirmation
    /// deletes nothing.
    ///
    /// # Errors
    /// Confirmation and store errors.
    pub fn delete_by_id(&self, id: RecordId, confirm: &dyn Confirm) -> Result<usize, ParamsError> {
        let docs = self.find_by_id(id)?;
        self.delete_confirmed(docs, confirm)
    }

    /// Delete the single document carrying `usertag` after confirmation
    ///
    /// # Errors
    /// [`ParamsError::NotFound`] unless exactly one document carries the
    /// tag; confirmation and store errors.
    pub fn delete_by_usertag(&self, usertag: &str, confirm: &dyn Confirm) -> Result<usize, ParamsError> {
        let doc = self.find_by_usertag(usertag)?;
        self.delete_confirmed(vec![doc], confirm)
    }

    /// Pairs of documents with identical fields
    ///
    /// # Errors
    /// Store errors.
    pub fn find_duplicates(&self) -> Result<Vec<DuplicatePair>, ParamsError> {
        let docs = self.store.find(&self.namespace, &Filter::all())?;
        Ok(duplicates::find_duplicates(&docs))
    }

    /// Delete duplicates one at a time until none remain
    ///
    /// # Errors
    /// Store errors.
    pub fn remove_duplicates(&self) -> Result<Vec<RecordId>, ParamsError> {
        duplicates::remove_duplicates(self.store.as_ref(), &self.namespace)
    }

    fn delete_confirmed(&self, docs: Vec<Document>, confirm: &dyn Confirm) -> Result<usize, ParamsError> {
        let mut deleted = 0;
        for doc in docs {
            let prompt = format!("Deleting\n {}", doc.to_json());
            if !confirm.confirm(&prompt)? {
                info!(namespace = %self.namespace, id = %doc.id(), "not deleted");
                continue;
            }
            if self.store.delete_one(&self.namespace, doc.id())? {
                info!(namespace = %self.namespace, id = %doc.id(), "deleted parameter record");
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn usertag_value(&self) -> Value {
        self.usertag
            .as_ref()
            .map_or(Value::Null, |tag| Value::String(tag.clone()))
    }
}

impl<S> std::fmt::Debug for ParameterRecord<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterRecord")
            .field("namespace", &self.namespace)
            .field("params", &self.params)
            .field("usertag", &self.usertag)
            .finish_non_exhaustive()
    }
}

fn exactly_one(ns: &Namespace, what: String, mut docs: Vec<Document>) -> Result<Document, ParamsError> {
    if docs.len() == 1 {
        if let Some(doc) = docs.pop() {
            return Ok(doc);
        }
    }
    Err(ParamsError::not_found(ns, what, docs.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::AlwaysNo;
    use crate::schema::SchemaDef;
    use epm_store::MemoryStore;
    use serde_json::json;

    fn schema() -> SchemaDef {
        SchemaDef::new("Dummy", "DummyParams")
            .with_default("a", json!(1))
            .with_default("b", json!(2))
    }

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn params_inject_reserved_fields() {
        let rec = ParameterRecord::builder(schema())
            .set("a", 5)
            .usertag("five")
            .auto_confirm()
            .open(store())
            .unwrap();
        let params = rec.params();
        assert_eq!(params["a"], json!(5));
        assert_eq!(params["b"], json!(2));
        assert_eq!(params["name"], json!("DummyParams"));
        assert_eq!(params["usertag"], json!("five"));
        assert_eq!(rec.params_no_reserved().len(), 2);
    }

    #[test]
    fn null_usertag_is_stored_explicitly() {
        let rec = ParameterRecord::open_default(schema(), store()).unwrap();
        assert_eq!(rec.params()["usertag"], Value::Null);
        assert!(rec.usertag().is_none());
    }

    #[test]
    fn unknown_override_rejected() {
        let result = ParameterRecord::builder(schema())
            .set("c", 3)
            .auto_confirm()
            .open(store());
        assert!(matches!(
            result,
            Err(ParamsError::InvalidField { field, .. }) if field == "c"
        ));
    }

    #[test]
    fn reserved_override_rejected() {
        let result = ParameterRecord::builder(schema())
            .set("name", "Other")
            .auto_confirm()
            .open(store());
        assert!(matches!(result, Err(ParamsError::InvalidField { .. })));
    }

    #[test]
    fn ignored_keys_left_out_of_hashable() {
        let schema = schema().with_default("notes", json!("")).ignoring("notes");
        let rec = ParameterRecord::builder(schema)
            .set("notes", "first try")
            .confirm(AlwaysNo)
            .open(store())
            .unwrap();
        assert!(rec.params().contains_key("notes"));
        assert!(!rec.hashable_params().contains_key("notes"));
        assert!(!rec.default_hashable_params().contains_key("notes"));
    }

    #[test]
    fn default_hashable_params_ignore_overrides() {
        let rec = ParameterRecord::builder(schema())
            .set("a", 9)
            .auto_confirm()
            .open(store())
            .unwrap();
        assert_eq!(rec.default_hashable_params()["a"], json!(1));
        assert_eq!(rec.hashable_params()["a"], json!(9));
    }

    #[test]
    fn stored_schema_never_carries_the_tag() {
        let rec = ParameterRecord::builder(schema())
            .usertag("best")
            .auto_confirm()
            .open(store())
            .unwrap();
        assert_eq!(rec.default_hashable_params()["usertag"], json!("best"));
        assert_eq!(rec.stored_schema()["usertag"], Value::Null);
        assert_eq!(
            rec.stored_schema().keys().collect::<Vec<_>>(),
            rec.default_hashable_params().keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn exactly_one_counts() {
        let ns = Namespace::new("p", "c");
        assert!(matches!(
            exactly_one(&ns, "x".into(), vec![]),
            Err(ParamsError::NotFound { found: 0, .. })
        ));
        let doc = Document::new(RecordId::new(), Fields::new());
        assert!(exactly_one(&ns, "x".into(), vec![doc.clone()]).is_ok());
        assert!(matches!(
            exactly_one(&ns, "x".into(), vec![doc.clone(), doc]),
            Err(ParamsError::NotFound { found: 2, .. })
        ));
    }
}
