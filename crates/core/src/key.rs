//! Key ordering for view indices
//!
//! This module defines:
//! - [`Key`]: tagged key union with a total order over heterogeneous values
//! - [`TieBreak`]: trailing id component of an index key, wildcard for equality
//! - [`IndexKey`]: the `(key, id)` composite used to place and find index rows
//!
//! ## Ordering Rules
//!
//! - `Wildcard` sorts after every other key and equals only itself
//! - `Null` sorts before every other key and equals only itself
//! - Values of the same kind use their natural order (numbers numerically,
//!   text by code point, booleans `false < true`, composites component-wise);
//!   booleans and numbers compare numerically with each other
//! - Values of different kinds compare by their canonical string form
//!   (booleans as `True`/`False`); if the strings tie, a fixed kind rank
//!   decides so that `Ord` agrees with `Eq`
//!
//! A bare scalar key behaves as a one-component composite, so `Key::Int(1)`
//! and `Key::Tuple(vec![Key::Int(1)])` are equal, and `(1, Wildcard)` is
//! greater than every `(1, x)`.

use crate::document::DocId;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// A view key
///
/// `Null` and `Wildcard` are distinct sentinels rather than special values of
/// another variant.
#[derive(Debug, Clone)]
pub enum Key {
    /// Absent value; sorts first
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Text
    Text(String),
    /// Composite key, compared component-wise
    Tuple(Vec<Key>),
    /// Match-anything sentinel; sorts last
    Wildcard,
}

impl Key {
    /// Build a composite key
    pub fn tuple<I, K>(parts: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Key::Tuple(parts.into_iter().map(Into::into).collect())
    }

    /// Components of the key; a scalar is its own single component
    pub fn components(&self) -> &[Key] {
        match self {
            Key::Tuple(parts) => parts,
            other => std::slice::from_ref(other),
        }
    }

    /// Check if this is the null sentinel
    pub fn is_null(&self) -> bool {
        matches!(self, Key::Null)
    }

    /// Check if this is the wildcard sentinel
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Key::Wildcard)
    }

    /// Convert to JSON. The wildcard has no JSON form and maps to `None`.
    pub fn to_json(&self) -> Option<Value> {
        Some(match self {
            Key::Null => Value::Null,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::from(*i),
            Key::Float(f) => Value::from(*f),
            Key::Text(s) => Value::String(s.clone()),
            Key::Tuple(parts) => Value::Array(
                parts
                    .iter()
                    .map(Key::to_json)
                    .collect::<Option<Vec<_>>>()?,
            ),
            Key::Wildcard => return None,
        })
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Null => 0,
            Key::Bool(_) => 1,
            Key::Int(_) | Key::Float(_) => 2,
            Key::Text(_) => 3,
            Key::Tuple(_) => 4,
            Key::Wildcard => 5,
        }
    }
}

/// Compare two single components
fn compare_component(a: &Key, b: &Key) -> Ordering {
    match (a, b) {
        (Key::Wildcard, Key::Wildcard) => Ordering::Equal,
        (Key::Wildcard, _) => Ordering::Greater,
        (_, Key::Wildcard) => Ordering::Less,
        (Key::Null, Key::Null) => Ordering::Equal,
        (Key::Null, _) => Ordering::Less,
        (_, Key::Null) => Ordering::Greater,
        (Key::Text(x), Key::Text(y)) => x.cmp(y),
        (Key::Tuple(x), Key::Tuple(y)) => compare_slices(x, y),
        _ => match (numeric(a), numeric(b)) {
            (Some(x), Some(y)) => x.compare(y),
            _ => compare_as_strings(a, b),
        },
    }
}

fn compare_slices(a: &[Key], b: &[Key]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match compare_component(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

fn compare_as_strings(a: &Key, b: &Key) -> Ordering {
    sort_form(a)
        .cmp(&sort_form(b))
        .then_with(|| a.rank().cmp(&b.rank()))
}

/// String a key sorts by against other kinds. Booleans are capitalized, so
/// `true` sorts among the upper-case letters, before any lower-case text.
fn sort_form(key: &Key) -> String {
    match key {
        Key::Bool(true) => "True".to_string(),
        Key::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

/// Booleans take part in numeric comparison as 0 and 1
#[derive(Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

fn numeric(key: &Key) -> Option<Numeric> {
    match key {
        Key::Bool(b) => Some(Numeric::Int(*b as i64)),
        Key::Int(i) => Some(Numeric::Int(*i)),
        Key::Float(f) => Some(Numeric::Float(*f)),
        _ => None,
    }
}

impl Numeric {
    fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }

    fn compare(self, other: Numeric) -> Ordering {
        match (self, other) {
            (Numeric::Int(x), Numeric::Int(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (self.as_f64(), other.as_f64());
                // NaN has no natural order; total_cmp keeps the order total
                x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
            }
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_slices(self.components(), other.components())
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

/// Canonical string form. Mixed-kind comparison uses it too, except that
/// booleans sort as `True`/`False`.
impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => f.write_str("null"),
            Key::Bool(b) => write!(f, "{}", b),
            Key::Int(i) => write!(f, "{}", i),
            Key::Float(x) => write!(f, "{:?}", x),
            Key::Text(s) => f.write_str(s),
            Key::Tuple(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", part)?;
                }
                f.write_str(")")
            }
            Key::Wildcard => f.write_str("*"),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<u32> for Key {
    fn from(i: u32) -> Self {
        Key::Int(i as i64)
    }
}

impl From<f64> for Key {
    fn from(f: f64) -> Self {
        Key::Float(f)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

impl From<&DocId> for Key {
    fn from(id: &DocId) -> Self {
        match id {
            DocId::Int(i) => Key::Int(*i),
            DocId::Text(s) => Key::Text(s.clone()),
        }
    }
}

impl<T: Into<Key>> From<Option<T>> for Key {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Key::Null)
    }
}

impl<T: Into<Key>> From<Vec<T>> for Key {
    fn from(parts: Vec<T>) -> Self {
        Key::tuple(parts)
    }
}

impl<A: Into<Key>, B: Into<Key>> From<(A, B)> for Key {
    fn from((a, b): (A, B)) -> Self {
        Key::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Key>, B: Into<Key>, C: Into<Key>> From<(A, B, C)> for Key {
    fn from((a, b, c): (A, B, C)) -> Self {
        Key::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

/// JSON arrays become composite keys; objects fall back to their JSON text
impl From<&Value> for Key {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Key::Null,
            Value::Bool(b) => Key::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Key::Int(i),
                None => Key::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Key::Text(s.clone()),
            Value::Array(items) => Key::Tuple(items.iter().map(Key::from).collect()),
            Value::Object(_) => Key::Text(v.to_string()),
        }
    }
}

impl From<Value> for Key {
    fn from(v: Value) -> Self {
        Key::from(&v)
    }
}

// ============================================================================
// Index keys
// ============================================================================

/// Trailing id component of an index key
///
/// For ordering, an absent id sorts before any present id. For equality, an
/// absent id matches any id; this lets a search key `(k, None)` land on every
/// row with key `k` regardless of which document produced it.
#[derive(Debug, Clone, Copy)]
pub struct TieBreak<'a>(pub Option<&'a DocId>);

impl<'a> TieBreak<'a> {
    /// Equality with the absent id acting as a wildcard
    pub fn matches(&self, other: &TieBreak<'_>) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Strict ordering with the absent id sorting lowest
    pub fn cmp_order(&self, other: &TieBreak<'_>) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }

    /// `self < other` under the ordering rule
    pub fn lt(&self, other: &TieBreak<'_>) -> bool {
        self.cmp_order(other) == Ordering::Less
    }

    /// `self <= other` under the ordering rule
    pub fn le(&self, other: &TieBreak<'_>) -> bool {
        self.cmp_order(other) != Ordering::Greater
    }
}

/// `(key, id)` composite that places rows in a view index
#[derive(Debug, Clone, Copy)]
pub struct IndexKey<'a> {
    /// Emitted key
    pub key: &'a Key,
    /// Emitting document, absent for search keys
    pub id: TieBreak<'a>,
}

impl<'a> IndexKey<'a> {
    /// Key of a stored row
    pub fn row(key: &'a Key, id: &'a DocId) -> Self {
        IndexKey {
            key,
            id: TieBreak(Some(id)),
        }
    }

    /// Search key matching any id
    pub fn search(key: &'a Key) -> Self {
        IndexKey {
            key,
            id: TieBreak(None),
        }
    }

    /// Lexicographic comparison: keys first, then ids.
    ///
    /// Ids that [`TieBreak::matches`] compare equal, so this is a search
    /// comparator rather than an `Ord`: two rows always have ids and are
    /// totally ordered, while a search key with no id ties with every row of
    /// the same key.
    pub fn compare(&self, other: &IndexKey<'_>) -> Ordering {
        match self.key.cmp(other.key) {
            Ordering::Equal if self.id.matches(&other.id) => Ordering::Equal,
            Ordering::Equal => self.id.cmp_order(&other.id),
            ord => ord,
        }
    }
}
