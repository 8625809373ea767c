//! Database engine for jsondb
//!
//! This crate puts views on top of the document store:
//! - Database: open/close, document operations, view definition and queries
//! - View indices: sorted `(key, id)` rows maintained on every mutation
//! - Queries: key ranges, skip/limit, grouped reduce, lock-free snapshots
//!
//! Documents and keys live in `jsondb-core`; files on disk are handled by
//! `jsondb-storage`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod database;
pub mod query;
pub mod view;

pub use database::{Database, DatabaseConfig, CONFIG_FILE_NAME, LOCK_FILE_NAME};
pub use query::{ViewQuery, ViewRow, ViewRows};
pub use view::{IndexRow, MapFn, ReduceFn, SortedIndex, ViewDefinition, ViewRegistry, ViewState};
