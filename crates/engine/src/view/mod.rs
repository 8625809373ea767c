//! Views: named, derived, sorted indices over stored documents
//!
//! A view is defined by a mapping function and an optional reduction
//! function:
//!
//! - **map**: `Document -> zero or more (Key, Value)` pairs. Each pair becomes
//!   an [`IndexRow`] tagged with the emitting document's id.
//! - **reduce**: `(keys, values, rereduce) -> Value`, applied per run of equal
//!   keys when a grouped query asks for it.
//!
//! ## Lifecycle
//!
//! `define` registers the view in [`ViewState::Indexing`] and builds its
//! index from every stored document; on success the view becomes
//! [`ViewState::Ready`]. After that every save and delete updates the index
//! incrementally. Definitions live in memory only and must be re-registered
//! after reopening a store.

pub mod index;
pub mod registry;

pub use index::{IndexRow, SortedIndex};
pub use registry::ViewRegistry;

use jsondb_core::{Document, Key};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Type-erased mapping function
pub type MapFn = Arc<dyn Fn(&Document) -> Vec<(Key, Value)> + Send + Sync>;

/// Type-erased reduction function: `(keys, values, rereduce)`
pub type ReduceFn = Arc<dyn Fn(&[Key], &[Value], bool) -> Value + Send + Sync>;

/// Index readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// Index has not been built successfully yet
    Indexing,
    /// Index reflects the store and is maintained on every mutation
    Ready,
}

/// Name plus map/reduce functions of a view
///
/// # Example
///
/// ```
/// use jsondb_engine::ViewDefinition;
/// use jsondb_core::Key;
///
/// let by_a = ViewDefinition::new("b_by_a", |doc| {
///     Some((Key::from(&doc["a"]), doc["b"].clone()))
/// });
/// assert_eq!(by_a.name(), "b_by_a");
/// assert!(!by_a.has_reduce());
/// ```
#[derive(Clone)]
pub struct ViewDefinition {
    name: String,
    map: MapFn,
    reduce: Option<ReduceFn>,
}

impl ViewDefinition {
    /// Define a view from a mapping closure.
    ///
    /// The closure may return anything iterable over `(key, value)` pairs:
    /// `None`/`Some(pair)` for zero or one row, a `Vec` or iterator for
    /// fan-out.
    pub fn new<M, I, K, V>(name: impl Into<String>, map: M) -> Self
    where
        M: Fn(&Document) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        let map: MapFn = Arc::new(move |doc: &Document| {
            map(doc)
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect()
        });
        Self {
            name: name.into(),
            map,
            reduce: None,
        }
    }

    /// Attach a reduction function
    pub fn with_reduce<R>(mut self, reduce: R) -> Self
    where
        R: Fn(&[Key], &[Value], bool) -> Value + Send + Sync + 'static,
    {
        self.reduce = Some(Arc::new(reduce));
        self
    }

    /// View name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if a reduction function is registered
    pub fn has_reduce(&self) -> bool {
        self.reduce.is_some()
    }

    /// Registered reduction function
    pub fn reduce_fn(&self) -> Option<&ReduceFn> {
        self.reduce.as_ref()
    }

    /// Run the mapping function on one document
    pub fn map(&self, doc: &Document) -> Vec<(Key, Value)> {
        (self.map)(doc)
    }
}

impl fmt::Debug for ViewDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDefinition")
            .field("name", &self.name)
            .field("reduce", &self.reduce.is_some())
            .finish()
    }
}
