//! DocumentStore: file-tree persistence of JSON documents
//!
//! One file per document under `root/objects`, addressed through
//! [`ObjectLayout`]. Every save is revision-checked:
//!
//! - no id: take the next id from the [`IdCounter`], store at revision 0;
//!   the counter advances only once the file is written
//! - id with a stored document: the incoming revision must equal the stored
//!   one, the document is written at revision + 1
//! - id without a stored document: accepted at the carried revision (or 0)
//!
//! A failed check returns [`Error::Conflict`] and writes nothing.
//!
//! ## Thread Safety
//!
//! DocumentStore does no locking of its own. Mutating methods take
//! `&mut self`; the owning database serializes all access behind one lock.

use crate::atomic::write_atomic;
use crate::counter::IdCounter;
use crate::layout::{ObjectLayout, ID_COUNTER_FILE};
use jsondb_core::{DocId, Document, Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Storage knobs, derived from the database configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Hex characters of the id digest used as shard directory name
    pub shard_width: usize,
    /// fsync temp files before renaming them into place
    pub sync: bool,
    /// Write indented JSON
    pub pretty: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            shard_width: 2,
            sync: false,
            pretty: true,
        }
    }
}

/// Document persistence on a sharded file tree
#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
    layout: ObjectLayout,
    counter: IdCounter,
    options: StoreOptions,
}

impl DocumentStore {
    /// Open (or create) the object tree under `root`
    pub fn open(root: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let layout = ObjectLayout::new(&root, options.shard_width);
        fs::create_dir_all(layout.objects_dir())?;
        let counter = IdCounter::new(root.join(ID_COUNTER_FILE), options.sync);
        Ok(Self {
            root,
            layout,
            counter,
            options,
        })
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Options the store was opened with
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Fetch a document
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no document has this id.
    pub fn get(&self, id: &DocId) -> Result<Document> {
        self.read_path(&self.layout.path_for(id))?
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    /// Existence check; never fails
    pub fn has(&self, id: &DocId) -> bool {
        self.layout.path_for(id).is_file()
    }

    /// Persist a document under the revision rules described in the module
    /// docs, returning it as written.
    pub fn save(&mut self, mut doc: Document) -> Result<Document> {
        // an auto id is only committed once the document is written
        let (id, auto) = match doc.id() {
            Some(id) => (id.clone(), None),
            None => {
                let next = self.counter.peek()?;
                (DocId::Int(next), Some(next))
            }
        };
        let path = self.layout.path_for(&id);

        let revision = match self.read_path(&path)? {
            Some(current) => {
                let actual = current.revision().unwrap_or(0);
                let expected = if auto.is_some() { None } else { doc.revision() };
                if expected != Some(actual) {
                    return Err(Error::Conflict {
                        id,
                        expected,
                        actual,
                    });
                }
                actual + 1
            }
            None if auto.is_some() => 0,
            None => doc.revision().unwrap_or(0),
        };

        debug!(target: "jsondb::store", id = %id, revision, "Saving document");
        doc.set_id(Some(id));
        doc.set_revision(Some(revision));
        self.write_path(&path, &doc)?;
        if let Some(next) = auto {
            self.counter.set(next + 1)?;
        }
        Ok(doc)
    }

    /// Remove a document
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if no document has this id.
    pub fn delete(&mut self, id: &DocId) -> Result<()> {
        match fs::remove_file(self.layout.path_for(id)) {
            Ok(()) => {
                debug!(target: "jsondb::store", id = %id, "Deleted document");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::NotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Override the next auto-generated id; explicit-id saves are unaffected
    pub fn set_next_id(&mut self, next: i64) -> Result<()> {
        self.counter.set(next)
    }

    /// Value the next auto-generated id will take
    pub fn next_id(&self) -> Result<i64> {
        self.counter.peek()
    }

    /// Stream every stored document.
    ///
    /// The file list is taken up front; files removed before they are read
    /// are skipped.
    pub fn scan(&self) -> Result<DocumentScan> {
        let mut paths = Vec::new();
        for shard in fs::read_dir(self.layout.objects_dir())? {
            let shard = shard?;
            if !shard.file_type()?.is_dir() {
                continue;
            }
            for entry in fs::read_dir(shard.path())? {
                let path = entry?.path();
                if ObjectLayout::is_document_file(&path) {
                    paths.push(path);
                }
            }
        }
        paths.sort();
        Ok(DocumentScan {
            paths: paths.into_iter(),
        })
    }

    /// Number of stored documents
    pub fn count(&self) -> Result<usize> {
        Ok(self.scan()?.len())
    }

    /// Remove every document. The id counter is kept.
    pub fn clear(&mut self) -> Result<()> {
        let objects = self.layout.objects_dir();
        match fs::remove_dir_all(objects) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::create_dir_all(objects)?;
        Ok(())
    }

    fn read_path(&self, path: &Path) -> Result<Option<Document>> {
        read_document(path)
    }

    fn write_path(&self, path: &Path, doc: &Document) -> Result<()> {
        let bytes = if self.options.pretty {
            serde_json::to_vec_pretty(doc)?
        } else {
            serde_json::to_vec(doc)?
        };
        write_atomic(path, &bytes, self.options.sync)?;
        Ok(())
    }
}

/// Read one document file; a missing file is `Ok(None)`
fn read_document(path: &Path) -> Result<Option<Document>> {
    match fs::read(path) {
        Ok(bytes) => {
            let doc: Document = serde_json::from_slice(&bytes)?;
            Ok(Some(doc))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Iterator over stored documents, returned by [`DocumentStore::scan`]
#[derive(Debug)]
pub struct DocumentScan {
    paths: std::vec::IntoIter<PathBuf>,
}

impl DocumentScan {
    /// Files remaining to be read
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True if no files remain
    pub fn is_empty(&self) -> bool {
        self.paths.len() == 0
    }
}

impl Iterator for DocumentScan {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        for path in self.paths.by_ref() {
            match read_document(&path) {
                Ok(Some(doc)) if doc.id().is_none() => {
                    return Some(Err(Error::InvalidDocument(format!(
                        "'{}' has no _id",
                        path.display()
                    ))))
                }
                Ok(Some(doc)) => return Some(Ok(doc)),
                Ok(None) => {
                    warn!(target: "jsondb::store", path = ?path, "Document removed during scan, skipping");
                    continue;
                }
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
