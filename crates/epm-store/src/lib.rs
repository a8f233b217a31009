//! EPM Document Store
//!
//! The persistence seam underneath parameter records.
//!
//! # Core Concepts
//!
//! - [`Document`]: a store-assigned [`RecordId`] plus a map of JSON fields
//! - [`Filter`]: exact-equality query over top-level fields
//! - [`Namespace`]: one database (project) and one collection (class)
//! - [`DocumentStore`]: the capability injected into every record
//!
//! Two backends ship with the crate: [`MemoryStore`] for tests and
//! throwaway sessions, and [`JsonFileStore`] which keeps one JSON file per
//! collection on disk.
//!
//! # Example
//!
//! ```rust
//! use epm_store::{DocumentStore, Filter, MemoryStore, Namespace};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! let ns = Namespace::new("demo", "LearningRate");
//!
//! let fields = json!({"lr": 0.1, "name": "LearningRate"});
//! let id = store.insert_one(&ns, fields.as_object().unwrap().clone()).unwrap();
//!
//! let found = store.find(&ns, &Filter::by_id(id)).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod document;
mod error;
mod file;
mod filter;
mod id;
mod memory;
mod store;

pub use document::{Document, Fields, ID_KEY};
pub use error::StoreError;
pub use file::JsonFileStore;
pub use filter::Filter;
pub use id::RecordId;
pub use memory::MemoryStore;
pub use store::{DocumentStore, Namespace};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
