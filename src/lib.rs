//! jsondb - embedded JSON document store with sorted map/reduce views
//!
//! Each document is one JSON file under the store root. Views are named,
//! in-memory indices built by a mapping function over every document and
//! kept current on every save and delete.
//!
//! # Quick Start
//!
//! ```no_run
//! use jsondb::{Database, Document, Key, ViewQuery};
//! use serde_json::json;
//!
//! # fn main() -> jsondb::Result<()> {
//! let db = Database::open("/tmp/jsondb-quickstart")?;
//!
//! let saved = db.save(Document::from_json(json!({"a": 2, "b": 22}))?)?;
//! assert_eq!(saved.revision(), Some(0));
//!
//! db.define("b_by_a", |doc| Some((Key::from(&doc["a"]), doc["b"].clone())))?;
//! let rows = db
//!     .view("b_by_a", ViewQuery::new().start_key(1).end_key(3))?
//!     .collect::<jsondb::Result<Vec<_>>>()?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `jsondb-core`: documents, ids, keys and their ordering, errors
//! - `jsondb-storage`: sharded object files, the id counter, atomic writes
//! - `jsondb-engine`: the [`Database`] facade, view indices and queries

pub use jsondb_core::{DocId, Document, Error, IndexKey, Key, Result, TieBreak, ID_FIELD, REV_FIELD};
pub use jsondb_engine::{
    Database, DatabaseConfig, IndexRow, ReduceFn, ViewDefinition, ViewQuery, ViewRow, ViewRows,
    ViewState,
};
pub use jsondb_storage::{ObjectLayout, StoreOptions};
