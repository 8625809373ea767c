//! Document model
//!
//! A [`Document`] is a JSON object plus two reserved fields managed by the
//! store:
//!
//! - `_id`: the document's [`DocId`], caller-supplied or allocated on first save
//! - `_rev`: the revision counter used for optimistic concurrency
//!
//! Both reserved fields are serialized inline with the user fields, so the
//! on-disk form of a document is a single flat JSON object.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Reserved field holding the document id
pub const ID_FIELD: &str = "_id";

/// Reserved field holding the document revision
pub const REV_FIELD: &str = "_rev";

static NULL: Value = Value::Null;

/// Document identifier
///
/// Store-generated ids are integers; callers may also supply string ids.
/// Serialized untagged, so `DocId::Int(3)` is the JSON number `3` and
/// `DocId::Text("a")` the JSON string `"a"`.
///
/// Ordering follows the key ordering rules: integers numerically, strings
/// lexicographically, and mixed kinds by their string form, integers first on
/// a tie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocId {
    /// Integer id (the form produced by the id counter)
    Int(i64),
    /// String id
    Text(String),
}

impl DocId {
    /// Stable byte encoding used to derive the object path.
    ///
    /// The JSON form keeps `Int(1)` and `Text("1")` apart.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            DocId::Int(i) => i.to_string().into_bytes(),
            DocId::Text(s) => {
                let mut out = Vec::with_capacity(s.len() + 2);
                out.push(b'"');
                out.extend_from_slice(s.as_bytes());
                out.push(b'"');
                out
            }
        }
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocId::Int(i) => write!(f, "{}", i),
            DocId::Text(s) => f.write_str(s),
        }
    }
}

impl Ord for DocId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DocId::Int(a), DocId::Int(b)) => a.cmp(b),
            (DocId::Text(a), DocId::Text(b)) => a.cmp(b),
            (DocId::Int(a), DocId::Text(b)) => a.to_string().as_str().cmp(b.as_str()).then(Ordering::Less),
            (DocId::Text(a), DocId::Int(b)) => a.as_str().cmp(b.to_string().as_str()).then(Ordering::Greater),
        }
    }
}

impl PartialOrd for DocId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for DocId {
    fn from(i: i64) -> Self {
        DocId::Int(i)
    }
}

impl From<i32> for DocId {
    fn from(i: i32) -> Self {
        DocId::Int(i as i64)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId::Text(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId::Text(s)
    }
}

impl From<&DocId> for DocId {
    fn from(id: &DocId) -> Self {
        id.clone()
    }
}

impl From<&DocId> for Value {
    fn from(id: &DocId) -> Self {
        match id {
            DocId::Int(i) => Value::from(*i),
            DocId::Text(s) => Value::from(s.as_str()),
        }
    }
}

/// A stored record: JSON object fields plus `_id` and `_rev`
///
/// # Example
///
/// ```
/// use jsondb_core::Document;
/// use serde_json::json;
///
/// let doc = Document::from_json(json!({"a": 1, "b": "x"})).unwrap();
/// assert_eq!(doc["a"], json!(1));
/// assert!(doc["missing"].is_null());
/// assert!(doc.id().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<DocId>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    revision: Option<u64>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Document {
    /// Create an empty document with no id and no revision
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON object.
    ///
    /// `_id` and `_rev` members, if present, become the reserved fields.
    /// Non-object input is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::InvalidDocument(format!(
                "expected a JSON object, got {}",
                value
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Convert back into a JSON object including the reserved fields
    pub fn to_json(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(id) = &self.id {
            map.insert(ID_FIELD.to_string(), Value::from(id));
        }
        if let Some(rev) = self.revision {
            map.insert(REV_FIELD.to_string(), Value::from(rev));
        }
        Value::Object(map)
    }

    /// Same document with `id` assigned
    pub fn with_id(mut self, id: impl Into<DocId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Document id, if one has been assigned
    pub fn id(&self) -> Option<&DocId> {
        self.id.as_ref()
    }

    /// Assign or clear the id
    pub fn set_id(&mut self, id: Option<DocId>) {
        self.id = id;
    }

    /// Revision this copy of the document carries
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Overwrite the carried revision
    pub fn set_revision(&mut self, revision: Option<u64>) {
        self.revision = revision;
    }

    /// Field value by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Set a user field, returning the previous value.
    ///
    /// Reserved names are rejected; use [`Document::set_id`] and
    /// [`Document::set_revision`] instead.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Result<Option<Value>> {
        let field = field.into();
        if field == ID_FIELD || field == REV_FIELD {
            return Err(Error::InvalidDocument(format!("'{}' is a reserved field", field)));
        }
        Ok(self.fields.insert(field, value.into()))
    }

    /// Remove a user field
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// User fields, without `_id` and `_rev`
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// True if the document carries no user fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl std::ops::Index<&str> for Document {
    type Output = Value;

    /// Missing fields read as `null`, like `serde_json::Value` indexing
    fn index(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(fields: Map<String, Value>) -> Self {
        let mut doc = Document::new();
        for (k, v) in fields {
            match k.as_str() {
                ID_FIELD => doc.id = serde_json::from_value(v).ok(),
                REV_FIELD => doc.revision = v.as_u64(),
                _ => {
                    doc.fields.insert(k, v);
                }
            }
        }
        doc
    }
}
