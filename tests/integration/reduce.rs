//! Grouped reduce

use crate::common::*;
use jsondb::{Document, Error, Key, ViewQuery};
use serde_json::{json, Map, Value};

/// Ten documents: category a {new: 4, old: 2}, b {new: 2}, c {new: 1, old: 1}
fn seed_categories(db: &jsondb::Database) {
    let fixture = [
        ("a", "new"),
        ("b", "new"),
        ("a", "old"),
        ("c", "new"),
        ("a", "new"),
        ("a", "new"),
        ("b", "new"),
        ("c", "old"),
        ("a", "old"),
        ("a", "new"),
    ];
    for (category, state) in fixture {
        db.save(doc(json!({"category": category, "state": state})))
            .unwrap();
    }
}

/// Count each distinct state in the run
fn histogram(_keys: &[Key], values: &[Value], _rereduce: bool) -> Value {
    let mut counts = Map::new();
    for state in values.iter().filter_map(Value::as_str) {
        let entry = counts.entry(state.to_string()).or_insert(json!(0));
        *entry = json!(entry.as_i64().unwrap_or(0) + 1);
    }
    Value::Object(counts)
}

fn define_states(db: &jsondb::Database) {
    db.define_with_reduce(
        "states_by_category",
        |d: &Document| Some((Key::from(&d["category"]), d["state"].clone())),
        histogram,
    )
    .unwrap();
}

#[test]
fn grouped_histogram() {
    let (_dir, db) = setup();
    define_states(&db);
    seed_categories(&db);

    assert_eq!(
        query(&db, "states_by_category", ViewQuery::new().group(true)),
        vec![
            json!({"key": "a", "value": {"new": 4, "old": 2}}),
            json!({"key": "b", "value": {"new": 2}}),
            json!({"key": "c", "value": {"new": 1, "old": 1}}),
        ]
    );
}

#[test]
fn grouped_histogram_defined_after_saves() {
    let (_dir, db) = setup();
    seed_categories(&db);
    define_states(&db);

    let rows = query(&db, "states_by_category", ViewQuery::new().group(true).key("c"));
    assert_eq!(rows, vec![json!({"key": "c", "value": {"new": 1, "old": 1}})]);
}

#[test]
fn grouped_reduce_tracks_updates() {
    let (_dir, db) = setup();
    define_states(&db);
    seed_categories(&db);

    // id 1 is a "b"/"new" document, id 3 the "c"/"new" one
    let mut moved = db.get(1).unwrap();
    moved.insert("state", "old").unwrap();
    db.save(moved).unwrap();
    db.delete(3).unwrap();

    assert_eq!(
        query(&db, "states_by_category", ViewQuery::new().group(true)),
        vec![
            json!({"key": "a", "value": {"new": 4, "old": 2}}),
            json!({"key": "b", "value": {"new": 1, "old": 1}}),
            json!({"key": "c", "value": {"old": 1}}),
        ]
    );
}

#[test]
fn grouped_reduce_with_range_and_limit() {
    let (_dir, db) = setup();
    define_states(&db);
    seed_categories(&db);

    let rows = query(
        &db,
        "states_by_category",
        ViewQuery::new().group(true).start_key("b").limit(1),
    );
    assert_eq!(rows, vec![json!({"key": "b", "value": {"new": 2}})]);
}

#[test]
fn reduce_receives_run_key_and_no_rereduce() {
    let (_dir, db) = setup();
    db.define_with_reduce(
        "echo",
        |d: &Document| Some((Key::from(&d["category"]), 1)),
        |keys: &[Key], values: &[Value], rereduce: bool| {
            json!({"keys": keys.len(), "key": keys[0].to_json(), "n": values.len(), "rereduce": rereduce})
        },
    )
    .unwrap();
    seed_categories(&db);

    let rows = query(&db, "echo", ViewQuery::new().group(true).key("b"));
    assert_eq!(
        rows[0]["value"],
        json!({"keys": 1, "key": "b", "n": 2, "rereduce": false})
    );
}

#[test]
fn no_reduce_returns_raw_rows() {
    let (_dir, db) = setup();
    define_states(&db);
    seed_categories(&db);

    let rows = query(&db, "states_by_category", ViewQuery::new().no_reduce(true).key("b"));
    assert_eq!(
        rows,
        vec![
            json!({"id": 1, "key": "b", "value": "new"}),
            json!({"id": 6, "key": "b", "value": "new"}),
        ]
    );
}

#[test]
fn ungrouped_reduce_is_not_implemented() {
    let (_dir, db) = setup();
    define_states(&db);
    assert!(matches!(
        db.view("states_by_category", ViewQuery::new()),
        Err(Error::NotImplemented(_))
    ));
}

#[test]
fn reduce_with_include_docs_is_invalid() {
    let (_dir, db) = setup();
    define_states(&db);
    assert!(matches!(
        db.view(
            "states_by_category",
            ViewQuery::new().group(true).include_docs(true)
        ),
        Err(Error::InvalidQuery(_))
    ));
}
