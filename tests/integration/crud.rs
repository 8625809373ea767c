//! Document operations: save, get, has, delete, revisions and ids

use crate::common::*;
use jsondb::{DocId, Error};
use serde_json::json;

#[test]
fn save_assigns_id_and_revision() {
    let (_dir, db) = setup();
    let first = db.save(doc(json!({"a": 1}))).unwrap();
    assert_eq!(first.id(), Some(&DocId::from(0)));
    assert_eq!(first.revision(), Some(0));
    assert!(db.has(0));

    let second = db.save(doc(json!({"a": 1}))).unwrap();
    assert_eq!(second.id(), Some(&DocId::from(1)));
}

#[test]
fn get_returns_saved_document() {
    let (_dir, db) = setup();
    let o1 = db.save(doc(json!({"a": 1}))).unwrap();
    let o2 = db.save(doc(json!({"b": 2}))).unwrap();

    let got1 = db.get(o1.id().unwrap()).unwrap();
    assert_eq!(got1, o1);
    assert_eq!(got1["a"], json!(1));
    assert_eq!(got1.revision(), Some(0));

    let got2 = db.get(o2.id().unwrap()).unwrap();
    assert_eq!(got2["b"], json!(2));
    assert_eq!(got2.to_json()["_id"], json!(1));
}

#[test]
fn get_missing_is_not_found() {
    let (_dir, db) = setup();
    let err = db.get(42).unwrap_err();
    assert!(err.is_not_found());
    assert!(!db.has(42));
}

#[test]
fn delete_removes_document() {
    let (_dir, db) = setup();
    let saved = db.save(doc(json!({"a": 1}))).unwrap();
    db.delete(saved.id().unwrap()).unwrap();
    assert!(!db.has(saved.id().unwrap()));
    assert!(db.delete(saved.id().unwrap()).unwrap_err().is_not_found());
}

#[test]
fn update_increments_revision() {
    let (_dir, db) = setup();
    let mut o = db.save(doc(json!({"a": 1}))).unwrap();
    o.insert("a", 2).unwrap();
    let updated = db.save(o).unwrap();
    assert_eq!(updated["a"], json!(2));
    assert_eq!(updated.revision(), Some(1));

    let got = db.get(updated.id().unwrap()).unwrap();
    assert_eq!(got["a"], json!(2));
    assert_eq!(got.revision(), Some(1));
}

#[test]
fn stale_revision_is_a_conflict() {
    let (_dir, db) = setup();
    let v0 = db.save(doc(json!({"a": 1}))).unwrap();
    let mut v1 = v0.clone();
    v1.insert("a", 2).unwrap();
    db.save(v1).unwrap();

    let mut stale = v0;
    stale.insert("a", 3).unwrap();
    match db.save(stale).unwrap_err() {
        Error::Conflict {
            id,
            expected,
            actual,
        } => {
            assert_eq!(id, DocId::from(0));
            assert_eq!(expected, Some(0));
            assert_eq!(actual, 1);
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(db.get(0).unwrap()["a"], json!(2));
}

#[test]
fn missing_revision_on_existing_id_is_a_conflict() {
    let (_dir, db) = setup();
    db.save(doc(json!({"a": 1}))).unwrap();
    let err = db.save(doc(json!({"_id": 0, "a": 9}))).unwrap_err();
    assert!(err.is_conflict());
}

#[test]
fn caller_supplied_ids() {
    let (_dir, db) = setup();
    let named = db.save(doc(json!({"_id": "alice", "age": 30}))).unwrap();
    assert_eq!(named.revision(), Some(0));
    assert!(db.has("alice"));

    // string and integer ids never collide
    db.save(doc(json!({"_id": "0"}))).unwrap();
    let auto = db.save(doc(json!({}))).unwrap();
    assert_eq!(auto.id(), Some(&DocId::from(0)));
    assert_eq!(db.count().unwrap(), 3);
}

#[test]
fn set_next_id_moves_the_counter() {
    let (_dir, db) = setup();
    db.set_next_id(100).unwrap();
    let saved = db.save(doc(json!({}))).unwrap();
    assert_eq!(saved.id(), Some(&DocId::from(100)));
}

#[test]
fn auto_id_colliding_with_stored_document_is_a_conflict() {
    let (_dir, db) = setup();
    db.save(doc(json!({"_id": 0, "pinned": true}))).unwrap();
    let err = db.save(doc(json!({"a": 1}))).unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(db.get(0).unwrap()["pinned"], json!(true));

    // the rejected save did not consume id 0
    db.delete(0).unwrap();
    assert_eq!(db.save(doc(json!({"a": 1}))).unwrap().id(), Some(&DocId::from(0)));
    assert_eq!(db.save(doc(json!({"a": 2}))).unwrap().id(), Some(&DocId::from(1)));
}

#[test]
fn non_object_documents_are_rejected() {
    assert!(matches!(
        jsondb::Document::from_json(json!("text")),
        Err(Error::InvalidDocument(_))
    ));
}
