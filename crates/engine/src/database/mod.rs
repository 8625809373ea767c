//! Database struct and open/close logic
//!
//! [`Database`] ties together:
//! - the on-disk [`DocumentStore`] (one JSON file per document)
//! - the in-memory [`ViewRegistry`] (sorted view indices)
//! - the `jsondb.toml` configuration
//! - an exclusive `.lock` file so only one process uses a root at a time
//!
//! ## Locking
//!
//! Store and views sit behind one `parking_lot::Mutex`. Every mutation takes
//! it for the whole "write file, then maintain views" sequence, so view
//! indices never disagree with the store. Queries take it only long enough to
//! snapshot a view's rows; see [`ViewRows`].

pub mod config;

pub use config::{DatabaseConfig, CONFIG_FILE_NAME};

use crate::query::{DocumentSource, ViewQuery, ViewRows};
use crate::view::{ViewDefinition, ViewRegistry, ViewState};
use jsondb_core::{DocId, Document, Error, Key, Result};
use jsondb_storage::{DocumentStore, ObjectLayout, OBJECTS_DIR};
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Lock file name in the store root
pub const LOCK_FILE_NAME: &str = ".lock";

/// Everything guarded by the store lock
pub(crate) struct DatabaseState {
    store: DocumentStore,
    views: ViewRegistry,
}

impl DocumentSource for Mutex<DatabaseState> {
    fn fetch(&self, id: &DocId) -> Result<Document> {
        self.lock().store.get(id)
    }
}

/// An open document store with its views
///
/// `Database` is `Send + Sync`; share it between threads with an `Arc`.
/// Dropping it releases the root's lock file.
///
/// # Example
///
/// ```no_run
/// use jsondb_engine::{Database, ViewQuery};
/// use jsondb_core::{Document, Key};
/// use serde_json::json;
///
/// # fn main() -> jsondb_core::Result<()> {
/// let db = Database::open("/tmp/jsondb-example")?;
/// db.save(Document::from_json(json!({"a": 1, "b": 11}))?)?;
/// db.define("b_by_a", |doc| Some((Key::from(&doc["a"]), doc["b"].clone())))?;
/// for row in db.view("b_by_a", ViewQuery::new().key(1))? {
///     println!("{}", row?.to_json());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Database {
    root: PathBuf,
    config: DatabaseConfig,
    shared: Arc<Mutex<DatabaseState>>,
    /// Held for the lifetime of the database; dropping it releases the lock.
    _lock_file: File,
}

impl Database {
    /// Open (or create) the store rooted at `path`.
    ///
    /// Takes the root's lock, then reads `jsondb.toml`, writing the default
    /// config first if the file is missing.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the config file is unreadable or invalid
    /// - [`Error::Locked`] if another handle holds the root
    /// - [`Error::Io`] if the root cannot be created
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let lock_file = lock_root(&root)?;
        let config = DatabaseConfig::load_or_init(&root.join(CONFIG_FILE_NAME))?;
        Self::open_locked(root, config, lock_file)
    }

    /// Open with an explicit configuration.
    ///
    /// The config is written to `jsondb.toml` so a later [`Database::open`]
    /// picks up the same settings. Nothing is written unless the root's lock
    /// was acquired.
    ///
    /// # Errors
    ///
    /// Same as [`Database::open`], plus [`Error::Config`] if the store already
    /// holds documents laid out with a different `shard_width`.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: DatabaseConfig) -> Result<Self> {
        config.store_options()?;
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        let lock_file = lock_root(&root)?;

        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let persisted = DatabaseConfig::from_file(&config_path)?;
            if persisted.shard_width != config.shard_width && holds_documents(&root)? {
                return Err(Error::Config(format!(
                    "shard_width {} does not match the existing store's {} in '{}'",
                    config.shard_width,
                    persisted.shard_width,
                    root.display()
                )));
            }
        }
        config.write_to_file(&config_path)?;
        Self::open_locked(root, config, lock_file)
    }

    fn open_locked(root: PathBuf, config: DatabaseConfig, lock_file: File) -> Result<Self> {
        let options = config.store_options()?;
        let store = DocumentStore::open(&root, options)?;
        info!(
            target: "jsondb::db",
            path = ?root,
            durability = %config.durability,
            shard_width = config.shard_width,
            next_id = store.next_id()?,
            "Opened database"
        );

        Ok(Database {
            root,
            config,
            shared: Arc::new(Mutex::new(DatabaseState {
                store,
                views: ViewRegistry::new(),
            })),
            _lock_file: lock_file,
        })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Configuration the database was opened with
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ========================================
    // Documents
    // ========================================

    /// Load a document by id.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no document has this id.
    pub fn get(&self, id: impl Into<DocId>) -> Result<Document> {
        self.shared.lock().store.get(&id.into())
    }

    /// True if a document with this id exists
    pub fn has(&self, id: impl Into<DocId>) -> bool {
        self.shared.lock().store.has(&id.into())
    }

    /// Save a document and update every ready view.
    ///
    /// A document without `_id` gets the next integer id and revision 0. A
    /// document with `_id` must carry the stored `_rev` (or none, if the id
    /// is new); the saved copy carries the incremented revision.
    ///
    /// # Errors
    ///
    /// [`Error::Conflict`] if the carried revision does not match the stored
    /// one. Nothing is written in that case.
    pub fn save(&self, doc: Document) -> Result<Document> {
        let mut state = self.shared.lock();
        let saved = state.store.save(doc)?;
        state.views.apply_save(&saved);
        Ok(saved)
    }

    /// Save `doc` under `id`, overwriting `doc`'s own `_id`.
    ///
    /// Revision rules are the same as for [`Database::save`].
    pub fn set(&self, id: impl Into<DocId>, mut doc: Document) -> Result<Document> {
        doc.set_id(Some(id.into()));
        self.save(doc)
    }

    /// Delete a document and retract its view rows.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no document has this id.
    pub fn delete(&self, id: impl Into<DocId>) -> Result<()> {
        let id = id.into();
        let mut state = self.shared.lock();
        state.store.delete(&id)?;
        state.views.apply_delete(&id);
        Ok(())
    }

    /// Set the next id handed out to documents saved without `_id`
    pub fn set_next_id(&self, next: i64) -> Result<()> {
        self.shared.lock().store.set_next_id(next)
    }

    /// Number of stored documents
    pub fn count(&self) -> Result<usize> {
        self.shared.lock().store.count()
    }

    /// Delete every document and empty every view index.
    ///
    /// View definitions and the id counter are kept.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.shared.lock();
        state.store.clear()?;
        state.views.reset();
        info!(target: "jsondb::db", path = ?self.root, "Cleared database");
        Ok(())
    }

    /// Delete the whole store root, consuming the handle
    pub fn destroy(self) -> Result<()> {
        let _state = self.shared.lock();
        std::fs::remove_dir_all(&self.root)?;
        info!(target: "jsondb::db", path = ?self.root, "Destroyed database");
        Ok(())
    }

    // ========================================
    // Views
    // ========================================

    /// Define a view from a mapping function and index every stored
    /// document.
    ///
    /// Redefining a name replaces the old view. See [`ViewDefinition::new`]
    /// for what the mapping function may return.
    pub fn define<M, I, K, V>(&self, name: impl Into<String>, map: M) -> Result<()>
    where
        M: Fn(&Document) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        self.define_view(ViewDefinition::new(name, map))
    }

    /// Define a view with a reduction function.
    ///
    /// Reduction runs only for grouped queries: the function receives the
    /// run's key, the values of every row in the run and `false` for
    /// `rereduce`.
    pub fn define_with_reduce<M, I, K, V, R>(
        &self,
        name: impl Into<String>,
        map: M,
        reduce: R,
    ) -> Result<()>
    where
        M: Fn(&Document) -> I + Send + Sync + 'static,
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
        R: Fn(&[Key], &[Value], bool) -> Value + Send + Sync + 'static,
    {
        self.define_view(ViewDefinition::new(name, map).with_reduce(reduce))
    }

    /// Register a prepared definition and index every stored document.
    ///
    /// # Errors
    ///
    /// Any error reading the store. The view stays registered in the
    /// indexing state, and queries against it fail with
    /// [`Error::ViewNotReady`] until a [`Database::reindex`] succeeds.
    pub fn define_view(&self, definition: ViewDefinition) -> Result<()> {
        let name = definition.name().to_string();
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        state.views.define(definition);
        debug!(target: "jsondb::db", view = %name, "Defined view");

        let docs = state.store.scan()?;
        let count = state.views.rebuild(&[name.clone()], docs)?;
        info!(target: "jsondb::db", view = %name, documents = count, "Read documents");
        Ok(())
    }

    /// Rebuild the named views from the store
    pub fn reindex(&self, names: &[&str]) -> Result<()> {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        self.reindex_names(names)
    }

    /// Rebuild every view from the store
    pub fn reindex_all(&self) -> Result<()> {
        let names = self.view_names();
        self.reindex_names(names)
    }

    fn reindex_names(&self, names: Vec<String>) -> Result<()> {
        let mut guard = self.shared.lock();
        let state = &mut *guard;
        if let Some(unknown) = names.iter().find(|n| !state.views.contains(n)) {
            return Err(Error::InvalidQuery(format!("unknown view '{}'", unknown)));
        }
        if names.is_empty() {
            return Ok(());
        }
        let docs = state.store.scan()?;
        let count = state.views.rebuild(&names, docs)?;
        info!(target: "jsondb::db", views = names.len(), documents = count, "Read documents");
        Ok(())
    }

    /// Query a view.
    ///
    /// The rows are read from a snapshot of the view taken now; the store
    /// lock is not held while the returned iterator is consumed.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidQuery`] for an unknown view or a bad argument mix
    /// - [`Error::ViewNotReady`] if the view has not finished indexing
    /// - [`Error::NotImplemented`] for an ungrouped query on a reducing view
    pub fn view(&self, name: &str, query: ViewQuery) -> Result<ViewRows> {
        query.validate()?;
        let (rows, reduce) = {
            let state = self.shared.lock();
            let view = state
                .views
                .get(name)
                .ok_or_else(|| Error::InvalidQuery(format!("unknown view '{}'", name)))?;
            if view.state() != ViewState::Ready {
                return Err(Error::ViewNotReady(name.to_string()));
            }
            (view.index().snapshot(), view.definition().reduce_fn().cloned())
        };
        let docs = if query.include_docs {
            Some(Arc::clone(&self.shared) as Arc<dyn DocumentSource>)
        } else {
            None
        };
        ViewRows::new(rows, reduce, &query, docs)
    }

    /// Registered view names in ascending order
    pub fn view_names(&self) -> Vec<String> {
        self.shared.lock().views.names()
    }

    /// Readiness of a view, or `None` if no view has this name
    pub fn view_state(&self, name: &str) -> Option<ViewState> {
        self.shared.lock().views.get(name).map(|v| v.state())
    }
}

/// Take the exclusive lock on `root/.lock`
fn lock_root(root: &Path) -> Result<File> {
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(root.join(LOCK_FILE_NAME))?;
    fs2::FileExt::try_lock_exclusive(&lock_file).map_err(|_| Error::Locked(root.to_path_buf()))?;
    Ok(lock_file)
}

/// True if any shard under `root/objects` holds a document file
fn holds_documents(root: &Path) -> Result<bool> {
    let objects = root.join(OBJECTS_DIR);
    if !objects.is_dir() {
        return Ok(false);
    }
    for shard in std::fs::read_dir(objects)? {
        let shard = shard?.path();
        if !shard.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(&shard)? {
            if ObjectLayout::is_document_file(&entry?.path()) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish()
    }
}
