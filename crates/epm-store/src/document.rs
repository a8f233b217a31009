//! Stored documents
//!
//! A [`Document`] is what comes back from a query: the store-assigned
//! [`RecordId`] and the field map. On disk and in CLI output the id travels
//! under the reserved [`ID_KEY`].

use std::collections::BTreeSet;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::StoreError;
use crate::id::RecordId;

/// Field map of a document (keys sorted, values are arbitrary JSON)
pub type Fields = serde_json::Map<String, Value>;

/// Key under which the record id is carried in serialized documents
pub const ID_KEY: &str = "_id";

/// A stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    id: RecordId,
    fields: Fields,
}

impl Document {
    /// Create document from id and fields
    #[inline]
    #[must_use]
    pub fn new(id: RecordId, fields: Fields) -> Self {
        Self { id, fields }
    }

    /// Store-assigned identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Field map, without the id
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Consume into the field map
    #[inline]
    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Lookup a single field
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field names including [`ID_KEY`]
    #[must_use]
    pub fn key_set(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self.fields.keys().cloned().collect();
        keys.insert(ID_KEY.to_string());
        keys
    }

    /// Render as a JSON object with the id under [`ID_KEY`]
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Fields::new();
        map.insert(ID_KEY.to_string(), Value::String(self.id.to_string()));
        map.extend(self.fields.clone());
        Value::Object(map)
    }

    /// Parse from a JSON object carrying [`ID_KEY`]
    ///
    /// # Errors
    /// Returns error if the value is not an object or the id is missing or
    /// malformed.
    pub fn from_json(value: Value) -> Result<Self, StoreError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidId {
                    value: other.to_string(),
                    reason: "document is not an object".to_string(),
                })
            }
        };
        let raw_id = map.remove(ID_KEY).ok_or_else(|| StoreError::InvalidId {
            value: Value::Object(map.clone()).to_string(),
            reason: format!("missing '{ID_KEY}'"),
        })?;
        let id = RecordId::from_json(&raw_id)?;
        Ok(Self { id, fields: map })
    }
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_KEY, &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn key_set_includes_id() {
        let doc = Document::new(RecordId::new(), fields(json!({"a": 1, "name": "X"})));
        let keys: Vec<_> = doc.key_set().into_iter().collect();
        assert_eq!(keys, vec!["_id", "a", "name"]);
    }

    #[test]
    fn json_carries_id() {
        let id = RecordId::new();
        let doc = Document::new(id, fields(json!({"a": 1})));
        let value = doc.to_json();
        assert_eq!(value["_id"], json!(id.to_string()));
        assert_eq!(value["a"], json!(1));

        let back = Document::from_json(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn from_json_requires_id() {
        let result = Document::from_json(json!({"a": 1}));
        assert!(matches!(result, Err(StoreError::InvalidId { .. })));
    }

    #[test]
    fn from_json_rejects_non_object() {
        assert!(Document::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn serde_matches_to_json() {
        let doc = Document::new(RecordId::new(), fields(json!({"nested": {"x": [1, 2]}})));
        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded, doc.to_json());
        let decoded: Document = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, doc);
    }
}
