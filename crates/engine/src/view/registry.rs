//! ViewRegistry: all views of one database and their maintenance
//!
//! The registry owns each view's definition, index and state. The database
//! calls into it while holding the store lock:
//!
//! - after every save: [`ViewRegistry::apply_save`]
//! - after every delete: [`ViewRegistry::apply_delete`]
//! - for define/reindex: [`ViewRegistry::rebuild`]
//!
//! Rebuilds are built off to the side and swapped in only when every
//! document has been read, so a failed rebuild leaves the prior index (or,
//! for a view that never finished indexing, the `Indexing` state) untouched.

use super::{SortedIndex, ViewDefinition, ViewState};
use jsondb_core::{DocId, Document, Error, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Registered view with its index
#[derive(Debug)]
pub struct View {
    definition: ViewDefinition,
    index: SortedIndex,
    state: ViewState,
}

impl View {
    /// Definition the view was registered with
    pub fn definition(&self) -> &ViewDefinition {
        &self.definition
    }

    /// Current index
    pub fn index(&self) -> &SortedIndex {
        &self.index
    }

    /// Readiness
    pub fn state(&self) -> ViewState {
        self.state
    }

    fn maintain_save(&mut self, id: &DocId, doc: &Document) {
        let removed = self.index.remove_document(id);
        let emitted = self.definition.map(doc);
        let added = emitted.len();
        self.index.insert_document(id, emitted);
        debug!(target: "jsondb::view", view = %self.definition.name(), id = %id, removed, added, "Updated index");
    }
}

/// Name → view map
#[derive(Debug, Default)]
pub struct ViewRegistry {
    views: BTreeMap<String, View>,
}

impl ViewRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view, replacing any prior definition of the same name.
    ///
    /// The view starts empty in [`ViewState::Indexing`]; call
    /// [`rebuild`](Self::rebuild) to populate it.
    pub fn define(&mut self, definition: ViewDefinition) {
        let name = definition.name().to_string();
        self.views.insert(
            name,
            View {
                definition,
                index: SortedIndex::new(),
                state: ViewState::Indexing,
            },
        );
    }

    /// Look up a view
    pub fn get(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// True if a view of this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    /// Registered names in ascending order
    pub fn names(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }

    /// Number of registered views
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// True if no views are registered
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Re-map a saved document in every ready view
    pub fn apply_save(&mut self, doc: &Document) {
        let id = match doc.id() {
            Some(id) => id,
            None => return,
        };
        for view in self.ready_views_mut() {
            view.maintain_save(id, doc);
        }
    }

    /// Retract a deleted document from every ready view
    pub fn apply_delete(&mut self, id: &DocId) {
        for view in self.ready_views_mut() {
            let removed = view.index.remove_document(id);
            debug!(target: "jsondb::view", view = %view.definition.name(), id = %id, removed, "Retracted document");
        }
    }

    /// Rebuild the named views from `docs`.
    ///
    /// Every name must be registered. On success each view's index is
    /// replaced (never merged) and the view becomes ready; returns the number
    /// of documents read. On error nothing changes.
    pub fn rebuild<I>(&mut self, names: &[String], docs: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<Document>>,
    {
        let mut fresh: Vec<(String, SortedIndex)> = Vec::with_capacity(names.len());
        for name in names {
            if !self.views.contains_key(name) {
                return Err(Error::InvalidQuery(format!("unknown view '{}'", name)));
            }
            if !fresh.iter().any(|(n, _)| n == name) {
                fresh.push((name.clone(), SortedIndex::new()));
            }
        }

        let mut count = 0;
        for doc in docs {
            let doc = doc?;
            let id = match doc.id() {
                Some(id) => id,
                None => continue,
            };
            for (name, index) in fresh.iter_mut() {
                if let Some(view) = self.views.get(name.as_str()) {
                    index.insert_document(id, view.definition.map(&doc));
                }
            }
            count += 1;
        }

        for (name, index) in fresh {
            if let Some(view) = self.views.get_mut(&name) {
                info!(target: "jsondb::view", view = %name, rows = index.len(), "View indexed");
                view.index = index;
                view.state = ViewState::Ready;
            }
        }
        Ok(count)
    }

    /// Empty every index and mark every view ready. Definitions are kept.
    pub fn reset(&mut self) {
        for view in self.views.values_mut() {
            view.index.clear();
            view.state = ViewState::Ready;
        }
    }

    fn ready_views_mut(&mut self) -> impl Iterator<Item = &mut View> {
        self.views
            .values_mut()
            .filter(|v| v.state == ViewState::Ready)
    }
}
