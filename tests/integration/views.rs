//! View definition, incremental maintenance and range queries

use crate::common::*;
use jsondb::{DocId, Document, Error, Key, ViewQuery, ViewState};
use serde_json::{json, Value};

fn abc_rows() -> Vec<Value> {
    vec![
        json!({"id": 2, "key": 1, "value": 11}),
        json!({"id": 0, "key": 2, "value": 22}),
        json!({"id": 1, "key": 3, "value": 33}),
    ]
}

#[test]
fn view_after_saves() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    seed_abc(&db);
    assert_eq!(query(&db, "b_by_a", ViewQuery::new()), abc_rows());
}

#[test]
fn view_defined_after_saves_is_kickstarted() {
    let (_dir, db) = setup();
    seed_abc(&db);
    define_b_by_a(&db);
    assert_eq!(db.view_state("b_by_a"), Some(ViewState::Ready));
    assert_eq!(query(&db, "b_by_a", ViewQuery::new()), abc_rows());
}

#[test]
fn update_replaces_row() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    let mut saved = seed_abc(&db);
    let mut o = saved.remove(2);
    o.insert("b", 1111).unwrap();
    db.save(o).unwrap();

    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new()),
        vec![
            json!({"id": 2, "key": 1, "value": 1111}),
            json!({"id": 0, "key": 2, "value": 22}),
            json!({"id": 1, "key": 3, "value": 33}),
        ]
    );
}

#[test]
fn update_moves_row_to_new_key() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    let mut saved = seed_abc(&db);
    let mut o = saved.remove(2);
    o.insert("a", 9).unwrap();
    db.save(o).unwrap();

    let keys: Vec<_> = query(&db, "b_by_a", ViewQuery::new())
        .iter()
        .map(|r| r["key"].clone())
        .collect();
    assert_eq!(keys, vec![json!(2), json!(3), json!(9)]);
}

#[test]
fn delete_retracts_row() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    let saved = seed_abc(&db);
    db.delete(saved[0].id().unwrap()).unwrap();
    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new()),
        vec![
            json!({"id": 2, "key": 1, "value": 11}),
            json!({"id": 1, "key": 3, "value": 33}),
        ]
    );
}

#[test]
fn delete_retracts_rows_with_mixed_number_and_text_keys() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    let pool = [json!(10), json!("2"), json!(3), json!("10"), json!(1), json!("a"), json!(20)];
    let saved: Vec<_> = pool
        .iter()
        .map(|a| db.save(doc(json!({"a": a, "b": 0}))).unwrap())
        .collect();
    assert_eq!(db.view("b_by_a", ViewQuery::new()).unwrap().count(), pool.len());

    for i in [4, 0, 6, 2, 1, 5, 3] {
        db.delete(saved[i].id().unwrap()).unwrap();
    }
    assert_eq!(db.count().unwrap(), 0);
    assert!(query(&db, "b_by_a", ViewQuery::new()).is_empty());
}

#[test]
fn by_key() {
    let (_dir, db) = setup();
    seed_abc(&db);
    define_b_by_a(&db);
    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new().key(2)),
        vec![json!({"id": 0, "key": 2, "value": 22})]
    );
}

#[test]
fn by_key_duplicate_keys_defined_before() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    seed_abc(&db);
    db.save(doc(json!({"a": 2, "b": 44}))).unwrap();
    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new().key(2)),
        vec![
            json!({"id": 0, "key": 2, "value": 22}),
            json!({"id": 3, "key": 2, "value": 44}),
        ]
    );
}

#[test]
fn by_key_duplicate_keys_defined_after() {
    let (_dir, db) = setup();
    seed_abc(&db);
    db.save(doc(json!({"a": 2, "b": 44}))).unwrap();
    define_b_by_a(&db);
    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new().key(2)),
        vec![
            json!({"id": 0, "key": 2, "value": 22}),
            json!({"id": 3, "key": 2, "value": 44}),
        ]
    );
}

#[test]
fn by_start_key() {
    let (_dir, db) = setup();
    seed_abc(&db);
    define_b_by_a(&db);
    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new().start_key(2)),
        vec![
            json!({"id": 0, "key": 2, "value": 22}),
            json!({"id": 1, "key": 3, "value": 33}),
        ]
    );
}

#[test]
fn by_end_key() {
    let (_dir, db) = setup();
    seed_abc(&db);
    define_b_by_a(&db);
    assert_eq!(
        query(&db, "b_by_a", ViewQuery::new().end_key(2)),
        vec![
            json!({"id": 2, "key": 1, "value": 11}),
            json!({"id": 0, "key": 2, "value": 22}),
        ]
    );
}

#[test]
fn skip_then_limit() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    for i in 0..10 {
        db.save(doc(json!({"a": i, "b": i * 10}))).unwrap();
    }
    let rows = query(&db, "b_by_a", ViewQuery::new().skip(3).limit(4));
    let keys: Vec<_> = rows.iter().map(|r| r["key"].as_i64().unwrap()).collect();
    assert_eq!(keys, vec![3, 4, 5, 6]);
}

#[test]
fn documents_without_the_field_sort_first() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    db.save(doc(json!({"a": 1, "b": 1}))).unwrap();
    db.save(doc(json!({"b": 2}))).unwrap();
    let rows = query(&db, "b_by_a", ViewQuery::new());
    assert_eq!(rows[0]["key"], Value::Null);
    assert_eq!(rows[1]["key"], json!(1));
}

#[test]
fn map_may_exclude_documents() {
    let (_dir, db) = setup();
    db.define("typed", |d: &Document| {
        d.get("type").map(|t| (Key::from(t), Value::Null))
    })
    .unwrap();
    db.save(doc(json!({"type": "post"}))).unwrap();
    db.save(doc(json!({"title": "untyped"}))).unwrap();
    assert_eq!(db.view("typed", ViewQuery::new()).unwrap().count(), 1);
}

#[test]
fn fan_out_and_retraction() {
    let (_dir, db) = setup();
    db.define("by_tag", |d: &Document| {
        d["tags"]
            .as_array()
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|t| (Key::from(t), 1))
            .collect::<Vec<_>>()
    })
    .unwrap();
    let post = db.save(doc(json!({"tags": ["rust", "db", "json"]}))).unwrap();
    db.save(doc(json!({"tags": ["rust"]}))).unwrap();
    assert_eq!(db.view("by_tag", ViewQuery::new()).unwrap().count(), 4);
    assert_eq!(db.view("by_tag", ViewQuery::new().key("rust")).unwrap().count(), 2);

    db.delete(post.id().unwrap()).unwrap();
    let rows = query(&db, "by_tag", ViewQuery::new());
    assert_eq!(rows, vec![json!({"id": 1, "key": "rust", "value": 1})]);
}

#[test]
fn composite_keys_with_wildcard_range() {
    let (_dir, db) = setup();
    db.define("by_author_date", |d: &Document| {
        Some((
            Key::from((Key::from(&d["author"]), Key::from(&d["date"]))),
            d["title"].clone(),
        ))
    })
    .unwrap();
    db.save(doc(json!({"author": "ann", "date": 3, "title": "c"}))).unwrap();
    db.save(doc(json!({"author": "bob", "date": 1, "title": "x"}))).unwrap();
    db.save(doc(json!({"author": "ann", "date": 1, "title": "a"}))).unwrap();
    db.save(doc(json!({"author": "ann", "date": 2, "title": "b"}))).unwrap();

    let titles: Vec<_> = query(
        &db,
        "by_author_date",
        ViewQuery::new()
            .start_key(Key::tuple(vec!["ann"]))
            .end_key(Key::from(("ann", Key::Wildcard))),
    )
    .iter()
    .map(|r| r["value"].clone())
    .collect();
    assert_eq!(titles, vec![json!("a"), json!("b"), json!("c")]);
}

#[test]
fn include_docs_attaches_documents() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    seed_abc(&db);
    let rows: Vec<_> = db
        .view("b_by_a", ViewQuery::new().key(3).include_docs(true))
        .unwrap()
        .collect::<jsondb::Result<_>>()
        .unwrap();
    assert_eq!(rows.len(), 1);
    let attached = rows[0].doc.as_ref().unwrap();
    assert_eq!(attached.id(), Some(&DocId::from(1)));
    assert_eq!(attached["b"], json!(33));
    assert_eq!(rows[0].to_json()["doc"]["_rev"], json!(0));
}

#[test]
fn include_docs_reports_documents_deleted_after_snapshot() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    seed_abc(&db);
    let mut rows = db
        .view("b_by_a", ViewQuery::new().include_docs(true))
        .unwrap();
    db.delete(2).unwrap();

    // id 2 (key 1) is first in the snapshot and no longer stored
    assert!(matches!(rows.next(), Some(Err(Error::NotFound(_)))));
    assert!(rows.next().unwrap().is_ok());
    assert!(rows.next().unwrap().is_ok());
    assert!(rows.next().is_none());
}

#[test]
fn invalid_queries() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    assert!(matches!(
        db.view("b_by_a", ViewQuery::new().key(1).start_key(0)),
        Err(Error::InvalidQuery(_))
    ));
    assert!(matches!(
        db.view("b_by_a", ViewQuery::new().group(true)),
        Err(Error::InvalidQuery(_))
    ));
    assert!(matches!(
        db.view("", ViewQuery::new()),
        Err(Error::InvalidQuery(_))
    ));
}

#[test]
fn redefine_replaces_view() {
    let (_dir, db) = setup();
    seed_abc(&db);
    define_b_by_a(&db);
    db.define("b_by_a", |d: &Document| Some((Key::from(&d["b"]), d["a"].clone())))
        .unwrap();
    let keys: Vec<_> = query(&db, "b_by_a", ViewQuery::new())
        .iter()
        .map(|r| r["key"].clone())
        .collect();
    assert_eq!(keys, vec![json!(11), json!(22), json!(33)]);
    assert_eq!(db.view_names(), vec!["b_by_a".to_string()]);
}

#[test]
fn reindex_rebuilds_from_store() {
    let (_dir, db) = setup();
    define_b_by_a(&db);
    db.define("count", |_: &Document| Some((Key::Null, 1))).unwrap();
    seed_abc(&db);
    db.reindex(&["b_by_a"]).unwrap();
    db.reindex_all().unwrap();
    assert_eq!(query(&db, "b_by_a", ViewQuery::new()), abc_rows());
    assert_eq!(db.view("count", ViewQuery::new()).unwrap().count(), 3);
}
