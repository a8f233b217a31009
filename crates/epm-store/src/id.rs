//! Store-assigned record identifiers

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::StoreError;

/// Identifier assigned by a store on first insert (ULID for sortability)
///
/// Rendered as 26 characters of Crockford base32 so ids printed by one run
/// can be fed back to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Ulid);

impl RecordId {
    /// Generate a fresh identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Wrap an existing ULID
    #[inline]
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Underlying ULID
    #[inline]
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// Parse from the JSON form used on disk
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidId`] if the value is not a ULID string.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, StoreError> {
        match value {
            serde_json::Value::String(s) => s.parse(),
            other => Err(StoreError::InvalidId {
                value: other.to_string(),
                reason: "expected a string".to_string(),
            }),
        }
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim())
            .map(Self)
            .map_err(|e| StoreError::InvalidId {
                value: s.to_string(),
                reason: e.to_string(),
            })
    }
}

impl From<Ulid> for RecordId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}
