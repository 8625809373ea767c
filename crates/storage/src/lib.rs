//! Document storage for jsondb
//!
//! This crate provides the persistence layer under the view engine:
//! - ObjectLayout: id → sharded file path (SHA-224 based)
//! - IdCounter: persisted counter for auto-generated ids
//! - DocumentStore: revision-checked CRUD over the object tree
//!
//! Writes go through a temp file and an atomic rename.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod atomic;
pub mod counter;
pub mod layout;
pub mod store;

pub use counter::IdCounter;
pub use layout::{ObjectLayout, ID_COUNTER_FILE, OBJECTS_DIR};
pub use store::{DocumentScan, DocumentStore, StoreOptions};
