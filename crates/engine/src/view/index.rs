//! SortedIndex: copy-on-write sorted rows plus a per-document row cache
//!
//! Rows are kept sorted by `(key, id)` in an `Arc<Vec<IndexRow>>`. Readers
//! take a [`snapshot`](SortedIndex::snapshot) (an `Arc` clone) and iterate it
//! without holding any lock. Writers go through `Arc::make_mut`, which
//! clones the vector only while a snapshot is still alive, so a snapshot never
//! changes underneath its reader.
//!
//! The `by_id` cache maps each document id to the rows it currently
//! contributes. Retracting a document looks its rows up here and binary
//! searches for each one instead of scanning the index.
//!
//! Invariant: the multiset of rows in `rows` equals the union of all `by_id`
//! entries. This holds for any keys; sort order is only as good as the
//! comparator's transitivity.

use jsondb_core::{DocId, IndexKey, Key};
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// One entry of a view index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    /// Emitting document
    pub id: DocId,
    /// Emitted key
    pub key: Key,
    /// Emitted value
    pub value: Value,
}

impl IndexRow {
    /// `(key, id)` placement key
    pub fn index_key(&self) -> IndexKey<'_> {
        IndexKey::row(&self.key, &self.id)
    }
}

/// Sorted rows of one view
#[derive(Debug, Clone, Default)]
pub struct SortedIndex {
    rows: Arc<Vec<IndexRow>>,
    by_id: FxHashMap<DocId, Vec<IndexRow>>,
}

impl SortedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the index holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Point-in-time view of the rows; later writes do not affect it
    pub fn snapshot(&self) -> Arc<Vec<IndexRow>> {
        Arc::clone(&self.rows)
    }

    /// Rows currently contributed by `id`
    pub fn rows_for(&self, id: &DocId) -> &[IndexRow] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of documents contributing at least one row
    pub fn document_count(&self) -> usize {
        self.by_id.len()
    }

    /// Insert the rows a document emitted. Rows with equal `(key, id)` keep
    /// their emission order.
    pub fn insert_document(&mut self, id: &DocId, emitted: Vec<(Key, Value)>) {
        if emitted.is_empty() {
            return;
        }
        let rows = Arc::make_mut(&mut self.rows);
        let cached = self.by_id.entry(id.clone()).or_default();
        for (key, value) in emitted {
            let row = IndexRow {
                id: id.clone(),
                key,
                value,
            };
            let pos = upper_position(rows, &row.index_key());
            rows.insert(pos, row.clone());
            cached.push(row);
        }
    }

    /// Remove every row `id` contributes; returns how many were removed
    ///
    /// Each cached row is located by binary search. Keys mixing numbers and
    /// text do not order transitively, so a search can miss a row that is
    /// present; any rows the searches leave behind are removed by a scan.
    pub fn remove_document(&mut self, id: &DocId) -> usize {
        let cached = match self.by_id.remove(id) {
            Some(cached) if !cached.is_empty() => cached,
            _ => return 0,
        };
        let rows = Arc::make_mut(&mut self.rows);
        let mut removed = 0;
        for row in &cached {
            let target = row.index_key();
            let lo = rows.partition_point(|r| r.index_key().compare(&target) == Ordering::Less);
            let hi = upper_position(rows, &target);
            // rows sharing (key, id) all belong to this document and go at once
            if lo < hi && rows[lo..hi].iter().all(|r| &r.id == id) {
                removed += rows.drain(lo..hi).count();
            }
        }
        if removed < cached.len() {
            let before = rows.len();
            rows.retain(|r| &r.id != id);
            let swept = before - rows.len();
            if swept > 0 {
                debug!(target: "jsondb::view", id = %id, swept, "Removed rows missed by binary search");
            }
            removed += swept;
        }
        removed
    }

    /// Drop all rows
    pub fn clear(&mut self) {
        self.rows = Arc::new(Vec::new());
        self.by_id.clear();
    }

    /// Check the cache/index invariant: every row belongs to exactly one
    /// cached entry. Linear; meant for tests and debugging.
    pub fn is_consistent(&self) -> bool {
        let cached: usize = self.by_id.values().map(Vec::len).sum();
        cached == self.rows.len()
            && self.by_id.iter().all(|(id, rows)| {
                rows.iter().all(|r| &r.id == id)
                    && self.rows.iter().filter(|r| &r.id == id).count() == rows.len()
            })
    }

    /// True if adjacent rows are in `(key, id)` order. Holds whenever the
    /// keys are mutually transitive, e.g. all numbers or all text.
    pub fn is_sorted(&self) -> bool {
        self.rows
            .windows(2)
            .all(|w| w[0].index_key().compare(&w[1].index_key()) != Ordering::Greater)
    }
}

/// First position whose row sorts after `target`
fn upper_position(rows: &[IndexRow], target: &IndexKey<'_>) -> usize {
    rows.partition_point(|r| r.index_key().compare(target) != Ordering::Greater)
}

/// First row whose key is `>= key`
pub fn lower_bound(rows: &[IndexRow], key: &Key) -> usize {
    let target = IndexKey::search(key);
    rows.partition_point(|r| r.index_key().compare(&target) == Ordering::Less)
}

/// One past the last row whose key is `<= key`
pub fn upper_bound(rows: &[IndexRow], key: &Key) -> usize {
    upper_position(rows, &IndexKey::search(key))
}
