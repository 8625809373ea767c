//! Shared test utilities for the integration suite.
//!
//! Import via `mod common;` from the suite's main.rs.

#![allow(dead_code)]

use jsondb::{Database, Document, Key, ViewQuery};
use serde_json::{json, Value};
use std::sync::Once;
use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness so `--nocapture` shows it.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Fresh database in a temporary directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn setup() -> (TempDir, Database) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("db")).unwrap();
    (dir, db)
}

/// Document from a JSON object literal
pub fn doc(value: Value) -> Document {
    Document::from_json(value).unwrap()
}

/// The `b_by_a` view: one row `(a, b)` per document
pub fn define_b_by_a(db: &Database) {
    db.define("b_by_a", |d: &Document| Some((Key::from(&d["a"]), d["b"].clone())))
        .unwrap();
}

/// Save `{a: 2, b: 22}`, `{a: 3, b: 33}`, `{a: 1, b: 11}` as ids 0, 1, 2
pub fn seed_abc(db: &Database) -> Vec<Document> {
    [(2, 22), (3, 33), (1, 11)]
        .iter()
        .map(|(a, b)| db.save(doc(json!({"a": a, "b": b}))).unwrap())
        .collect()
}

/// Run a query and render every row as JSON
pub fn query(db: &Database, view: &str, query: ViewQuery) -> Vec<Value> {
    db.view(view, query)
        .unwrap()
        .map(|row| row.unwrap().to_json())
        .collect()
}
