//! Query surface over view indices
//!
//! A query selects a contiguous slice of a view's sorted rows:
//!
//! - **exact key** (`key`): from the first row with key `>= key`, while the
//!   row key equals `key`
//! - **range** (`start_key` / `end_key`, both inclusive):
//!   - `start_key`: omitted or `Null` starts at 0, `Wildcard` selects nothing,
//!     otherwise the first row with key `>= start_key`
//!   - `end_key`: omitted or `Wildcard` runs to the end, `Null` selects
//!     nothing, otherwise one past the last row with key `<= end_key`
//!
//! Then `skip` drops the first N selected rows (rows read while checking an
//! exact key count too), an optional grouped reduction folds runs of equal
//! keys, and `limit` caps the number of emitted rows.
//!
//! ## Snapshot Reads
//!
//! [`ViewRows`] iterates an `Arc` snapshot of the index taken under the store
//! lock; the lock is released before the first row is produced. Dropping a
//! half-consumed `ViewRows` therefore never blocks other operations, and
//! writes made during iteration are not visible to it. Only `include_docs`
//! takes the lock again, briefly, once per emitted row.

use crate::view::index::{lower_bound, upper_bound, IndexRow};
use crate::view::ReduceFn;
use jsondb_core::{DocId, Document, Error, Key, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Query parameters for [`Database::view`](crate::Database::view)
///
/// # Example
///
/// ```
/// use jsondb_engine::ViewQuery;
///
/// let query = ViewQuery::new().start_key(2).end_key(5).skip(1).limit(10);
/// assert!(query.validate().is_ok());
/// assert!(ViewQuery::new().key(1).start_key(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    /// Exact key to match
    pub key: Option<Key>,
    /// Inclusive lower bound
    pub start_key: Option<Key>,
    /// Inclusive upper bound
    pub end_key: Option<Key>,
    /// Attach each row's document
    pub include_docs: bool,
    /// Reduce runs of equal keys
    pub group: bool,
    /// Return raw rows even if the view has a reduce function
    pub no_reduce: bool,
    /// Rows to drop from the front of the selection
    pub skip: usize,
    /// Maximum rows to emit
    pub limit: Option<usize>,
}

impl ViewQuery {
    /// Query selecting every row
    pub fn new() -> Self {
        Self::default()
    }

    /// Match rows whose key equals `key`
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Inclusive lower bound
    pub fn start_key(mut self, key: impl Into<Key>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    /// Inclusive upper bound
    pub fn end_key(mut self, key: impl Into<Key>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    /// Attach documents to rows
    pub fn include_docs(mut self, include: bool) -> Self {
        self.include_docs = include;
        self
    }

    /// Group by key and reduce
    pub fn group(mut self, group: bool) -> Self {
        self.group = group;
        self
    }

    /// Skip reduction
    pub fn no_reduce(mut self, no_reduce: bool) -> Self {
        self.no_reduce = no_reduce;
        self
    }

    /// Drop the first `n` selected rows
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Emit at most `n` rows
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Check argument combinations that are invalid for every view
    ///
    /// # Errors
    ///
    /// [`Error::InvalidQuery`] if `key` is combined with `start_key` or
    /// `end_key`.
    pub fn validate(&self) -> Result<()> {
        if self.key.is_some() && (self.start_key.is_some() || self.end_key.is_some()) {
            return Err(Error::InvalidQuery(
                "key cannot be combined with start_key/end_key".to_string(),
            ));
        }
        Ok(())
    }
}

/// One query result
///
/// Raw rows carry the emitting document's id; grouped-reduce rows have none.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRow {
    /// Emitting document (None for reduced rows)
    pub id: Option<DocId>,
    /// Row key
    pub key: Key,
    /// Emitted or reduced value
    pub value: Value,
    /// Document, when `include_docs` was requested
    pub doc: Option<Document>,
}

impl ViewRow {
    /// JSON form: `{"id", "key", "value"}` plus `"doc"` when present
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        if let Some(id) = &self.id {
            map.insert("id".to_string(), Value::from(id));
        }
        map.insert("key".to_string(), self.key.to_json().unwrap_or(Value::Null));
        map.insert("value".to_string(), self.value.clone());
        if let Some(doc) = &self.doc {
            map.insert("doc".to_string(), doc.to_json());
        }
        Value::Object(map)
    }
}

impl From<&IndexRow> for ViewRow {
    fn from(row: &IndexRow) -> Self {
        ViewRow {
            id: Some(row.id.clone()),
            key: row.key.clone(),
            value: row.value.clone(),
            doc: None,
        }
    }
}

/// Where `include_docs` fetches documents from
pub(crate) trait DocumentSource: Send + Sync {
    fn fetch(&self, id: &DocId) -> Result<Document>;
}

/// Selection state over a snapshot: range, exact-key filter and skip
#[derive(Debug, Clone)]
struct Cursor {
    pos: usize,
    end: usize,
    exact: Option<Key>,
    skip: usize,
}

impl Cursor {
    fn new(rows: &[IndexRow], query: &ViewQuery) -> Self {
        let (pos, end) = resolve_range(rows, query);
        Cursor {
            pos,
            end,
            exact: query.key.clone(),
            skip: query.skip,
        }
    }

    fn next<'r>(&mut self, rows: &'r [IndexRow]) -> Option<&'r IndexRow> {
        while self.pos < self.end {
            let row = &rows[self.pos];
            self.pos += 1;
            if let Some(key) = &self.exact {
                if row.key != *key {
                    self.pos = self.end;
                    return None;
                }
            }
            if self.skip > 0 {
                self.skip -= 1;
                continue;
            }
            return Some(row);
        }
        None
    }
}

/// `[start, end)` positions selected by the query's key arguments
fn resolve_range(rows: &[IndexRow], query: &ViewQuery) -> (usize, usize) {
    if let Some(key) = &query.key {
        return (lower_bound(rows, key), rows.len());
    }
    let start = match &query.start_key {
        None | Some(Key::Null) => 0,
        Some(Key::Wildcard) => rows.len(),
        Some(key) => lower_bound(rows, key),
    };
    let end = match &query.end_key {
        None | Some(Key::Wildcard) => rows.len(),
        Some(Key::Null) => 0,
        Some(key) => upper_bound(rows, key),
    };
    (start, end.max(start))
}

/// Fold runs of equal keys, emitting at most `limit` groups
fn reduce_groups(
    rows: &[IndexRow],
    mut cursor: Cursor,
    reduce: &ReduceFn,
    limit: Option<usize>,
) -> Vec<ViewRow> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut out = Vec::new();
    if limit == 0 {
        return out;
    }

    let flush = |key: Key, values: Vec<Value>| {
        let keys = [key];
        let value = reduce(&keys, &values, false);
        let [key] = keys;
        ViewRow {
            id: None,
            key,
            value,
            doc: None,
        }
    };

    let mut run: Option<(Key, Vec<Value>)> = None;
    while let Some(row) = cursor.next(rows) {
        match run.as_mut() {
            Some((key, values)) if *key == row.key => values.push(row.value.clone()),
            _ => {
                if let Some((key, values)) = run.take() {
                    out.push(flush(key, values));
                    if out.len() >= limit {
                        return out;
                    }
                }
                run = Some((row.key.clone(), vec![row.value.clone()]));
            }
        }
    }
    if let Some((key, values)) = run {
        out.push(flush(key, values));
    }
    out
}

enum RowsInner {
    Rows {
        rows: Arc<Vec<IndexRow>>,
        cursor: Cursor,
        remaining: Option<usize>,
        docs: Option<Arc<dyn DocumentSource>>,
    },
    Reduced(std::vec::IntoIter<ViewRow>),
}

/// Lazily produced query results
///
/// Items are `Result`s because `include_docs` may find a row's document
/// deleted since the snapshot was taken; that row yields
/// [`Error::NotFound`]. Collect into `Result<Vec<_>>` to fail the whole query
/// on such a row.
pub struct ViewRows {
    inner: RowsInner,
}

impl ViewRows {
    pub(crate) fn new(
        rows: Arc<Vec<IndexRow>>,
        reduce: Option<ReduceFn>,
        query: &ViewQuery,
        docs: Option<Arc<dyn DocumentSource>>,
    ) -> Result<Self> {
        query.validate()?;
        let reduce = reduce.filter(|_| !query.no_reduce);

        let inner = match reduce {
            Some(reduce) => {
                if !query.group {
                    return Err(Error::NotImplemented(
                        "reduce without group is not supported".to_string(),
                    ));
                }
                if query.include_docs {
                    return Err(Error::InvalidQuery(
                        "include_docs cannot be combined with reduce".to_string(),
                    ));
                }
                let cursor = Cursor::new(&rows, query);
                RowsInner::Reduced(reduce_groups(&rows, cursor, &reduce, query.limit).into_iter())
            }
            None => {
                if query.group && !query.no_reduce {
                    return Err(Error::InvalidQuery(
                        "group requires a view with a reduce function".to_string(),
                    ));
                }
                let cursor = Cursor::new(&rows, query);
                RowsInner::Rows {
                    rows,
                    cursor,
                    remaining: query.limit,
                    docs: docs.filter(|_| query.include_docs),
                }
            }
        };
        Ok(ViewRows { inner })
    }
}

impl Iterator for ViewRows {
    type Item = Result<ViewRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RowsInner::Reduced(groups) => groups.next().map(Ok),
            RowsInner::Rows {
                rows,
                cursor,
                remaining,
                docs,
            } => {
                if *remaining == Some(0) {
                    return None;
                }
                let row = cursor.next(rows.as_slice())?;
                if let Some(n) = remaining.as_mut() {
                    *n -= 1;
                }
                let mut out = ViewRow::from(row);
                if let Some(source) = docs {
                    match source.fetch(&row.id) {
                        Ok(doc) => out.doc = Some(doc),
                        Err(e) => return Some(Err(e)),
                    }
                }
                Some(Ok(out))
            }
        }
    }
}

impl std::fmt::Debug for ViewRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            RowsInner::Rows { cursor, .. } => f
                .debug_struct("ViewRows")
                .field("pos", &cursor.pos)
                .field("end", &cursor.end)
                .finish(),
            RowsInner::Reduced(groups) => f
                .debug_struct("ViewRows")
                .field("groups", &groups.len())
                .finish(),
        }
    }
}
