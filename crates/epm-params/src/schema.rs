//! Parameter schemas
//!
//! A [`ParamSchema`] is what a concrete parameter type declares: which
//! project it belongs to, the collection it lives in, its default field
//! values and the fields left out of identity. [`SchemaDef`] is the
//! data-driven implementation, loadable from YAML.

use std::collections::BTreeSet;

use epm_store::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ParamsError;

/// Reserved field holding the class name
pub const NAME_KEY: &str = "name";

/// Reserved field holding the optional human label
pub const USERTAG_KEY: &str = "usertag";

/// Field names no schema may declare
pub const RESERVED_KEYS: [&str; 2] = [NAME_KEY, USERTAG_KEY];

/// Capability every concrete parameter type provides
pub trait ParamSchema {
    /// Collection name, one per concrete type
    fn class_name(&self) -> &str;

    /// Database name
    fn project_name(&self) -> &str;

    /// Declared default values; must not contain [`RESERVED_KEYS`]
    fn default_params(&self) -> Fields;

    /// Fields excluded from identity and never stored
    fn ignore_hash_keys(&self) -> BTreeSet<String>;
}

/// Check that declared defaults stay clear of reserved names
///
/// # Errors
/// [`ParamsError::InvalidField`] naming the first reserved key found.
pub fn validate_defaults(schema: &dyn ParamSchema) -> Result<(), ParamsError> {
    let defaults = schema.default_params();
    for key in RESERVED_KEYS {
        if defaults.contains_key(key) {
            return Err(ParamsError::invalid_field(
                schema.class_name(),
                key,
                "reserved names cannot be declared as defaults",
            ));
        }
    }
    Ok(())
}

/// Schema defined by data rather than by a Rust type
///
/// ```rust
/// use epm_params::{ParamSchema, SchemaDef};
/// use serde_json::json;
///
/// let schema = SchemaDef::new("Dummy", "DummyParams")
///     .with_default("a", json!(1))
///     .with_default("notes", json!(""))
///     .ignoring("notes");
/// assert_eq!(schema.default_params().len(), 2);
/// assert!(schema.ignore_hash_keys().contains("notes"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Collection name
    #[serde(rename = "class")]
    pub class_name: String,
    /// Database name
    #[serde(rename = "project")]
    pub project_name: String,
    /// Default field values
    #[serde(default)]
    pub defaults: Fields,
    /// Fields excluded from identity
    #[serde(default)]
    pub ignore_hash_keys: BTreeSet<String>,
}

impl SchemaDef {
    /// Create an empty schema
    #[must_use]
    pub fn new(project_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            project_name: project_name.into(),
            defaults: Fields::new(),
            ignore_hash_keys: BTreeSet::new(),
        }
    }

    /// Add a default field
    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    /// Drop a default field
    #[must_use]
    pub fn without_default(mut self, key: &str) -> Self {
        self.defaults.remove(key);
        self
    }

    /// Exclude a field from identity
    #[must_use]
    pub fn ignoring(mut self, key: impl Into<String>) -> Self {
        self.ignore_hash_keys.insert(key.into());
        self
    }
}

impl ParamSchema for SchemaDef {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn default_params(&self) -> Fields {
        self.defaults.clone()
    }

    fn ignore_hash_keys(&self) -> BTreeSet<String> {
        self.ignore_hash_keys.clone()
    }
}

/// A set of schemas read from one YAML file
///
/// ```yaml
/// schemas:
///   - project: Dummy
///     class: DummyParams
///     defaults: {a: 1, b: 2}
///     ignore_hash_keys: []
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Declared schemas
    pub schemas: Vec<SchemaDef>,
}

impl SchemaCatalog {
    /// Parse from YAML
    ///
    /// # Errors
    /// Returns error if the YAML is malformed, a class is declared twice or
    /// a schema declares a reserved field.
    pub fn from_yaml(yaml: &str) -> Result<Self, ParamsError> {
        let catalog: Self =
            serde_yaml::from_str(yaml).map_err(|e| ParamsError::SchemaDefinition(e.to_string()))?;
        let mut seen = BTreeSet::new();
        for schema in &catalog.schemas {
            let key = (schema.project_name.as_str(), schema.class_name.as_str());
            if !seen.insert(key) {
                return Err(ParamsError::SchemaDefinition(format!(
                    "class '{}' declared twice in project '{}'",
                    schema.class_name, schema.project_name
                )));
            }
            validate_defaults(schema)?;
        }
        Ok(catalog)
    }

    /// Find a schema by class name
    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<&SchemaDef> {
        self.schemas.iter().find(|s| s.class_name == class_name)
    }

    /// Declared class names
    #[must_use]
    pub fn class_names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.class_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_defaults_rejects_reserved() {
        let schema = SchemaDef::new("P", "C").with_default("usertag", json!("x"));
        assert!(matches!(
            validate_defaults(&schema),
            Err(ParamsError::InvalidField { field, .. }) if field == "usertag"
        ));
        let schema = SchemaDef::new("P", "C").with_default("name", json!("x"));
        assert!(validate_defaults(&schema).is_err());
        assert!(validate_defaults(&SchemaDef::new("P", "C").with_default("a", json!(1))).is_ok());
    }

    #[test]
    fn catalog_from_yaml() {
        let yaml = r"
schemas:
  - project: Dummy
    class: DummyParams
    defaults:
      a: 1
      b: 2
  - project: Dummy
    class: NotedParams
    defaults:
      lr: 0.01
      notes: ''
      optimizer: {name: adam, beta: 0.9}
    ignore_hash_keys: [notes]
";
        let catalog = SchemaCatalog::from_yaml(yaml).unwrap();
        assert_eq!(catalog.class_names(), vec!["DummyParams", "NotedParams"]);

        let noted = catalog.get("NotedParams").unwrap();
        assert_eq!(noted.defaults["optimizer"]["name"], json!("adam"));
        assert!(noted.ignore_hash_keys().contains("notes"));
        assert!(catalog.get("Missing").is_none());
    }

    #[test]
    fn catalog_rejects_duplicate_class() {
        let yaml = r"
schemas:
  - {project: P, class: C}
  - {project: P, class: C}
";
        assert!(matches!(
            SchemaCatalog::from_yaml(yaml),
            Err(ParamsError::SchemaDefinition(_))
        ));
    }

    #[test]
    fn catalog_rejects_reserved_default() {
        let yaml = "schemas:\n  - {project: P, class: C, defaults: {name: x}}\n";
        assert!(matches!(
            SchemaCatalog::from_yaml(yaml),
            Err(ParamsError::InvalidField { .. })
        ));
    }

    #[test]
    fn catalog_rejects_malformed_yaml() {
        assert!(SchemaCatalog::from_yaml("schemas: [").is_err());
    }
}
