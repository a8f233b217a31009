//! EPM Parameter Records
//!
//! Named parameter sets stored as documents, one collection per class,
//! deduplicated by content and kept schema-consistent as class defaults
//! change.
//!
//! # Core Concepts
//!
//! - [`ParamSchema`]: what a parameter type declares (project, class,
//!   defaults, fields ignored for identity)
//! - [`ParameterRecord`]: overrides + schema + injected store; reconciles
//!   the collection on open
//! - [`ParameterRecord::hash_name`]: content-addressed lookup-or-insert
//! - [`Confirm`]: injected yes/no policy for schema changes and deletions
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use epm_params::{ParameterRecord, SchemaDef};
//! use epm_store::{DocumentStore, MemoryStore};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), epm_params::ParamsError> {
//! let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
//! let schema = SchemaDef::new("Dummy", "DummyParams")
//!     .with_default("a", json!(1))
//!     .with_default("b", json!(2));
//!
//! let first = ParameterRecord::builder(schema.clone())
//!     .set("a", 3)
//!     .auto_confirm()
//!     .open(store.clone())?;
//! let again = ParameterRecord::builder(schema)
//!     .set("a", 3)
//!     .auto_confirm()
//!     .open(store)?;
//!
//! assert_eq!(first.hash_name()?, again.hash_name()?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod confirm;
pub mod duplicates;
pub mod error;
pub mod fingerprint;
pub mod reconcile;
pub mod record;
pub mod schema;

// Re-exports
pub use confirm::{
    parse_response, AlwaysNo, AlwaysYes, AnswerSource, Confirm, ConfirmFn, ConfirmPolicy,
    SharedStdin, TerminalConfirm,
};
pub use duplicates::DuplicatePair;
pub use error::ParamsError;
pub use fingerprint::Fingerprint;
pub use reconcile::{DriftKind, ReconcileReport, SchemaDiff};
pub use record::{ParameterRecord, RecordBuilder};
pub use schema::{ParamSchema, SchemaCatalog, SchemaDef, NAME_KEY, RESERVED_KEYS, USERTAG_KEY};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with parameter records
    pub use crate::{
        AlwaysNo, AlwaysYes, Confirm, ParamSchema, ParameterRecord, ParamsError, SchemaDef,
    };
    pub use epm_store::{DocumentStore, Fields, RecordId};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
