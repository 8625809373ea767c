//! On-disk layout of a store root
//!
//! ```text
//! root/
//!   jsondb.toml          configuration
//!   id_counter           next auto-generated id, as text
//!   objects/<shard>/<rest>.json
//! ```
//!
//! The object path is derived from the SHA-224 digest of the id's canonical
//! bytes: the first `shard_width` hex characters name the shard directory and
//! the remaining characters name the file. With the default width of 2 no
//! directory holds more than 256 shards.

use jsondb_core::DocId;
use sha2::{Digest, Sha224};
use std::path::{Path, PathBuf};

/// Directory holding the document files
pub const OBJECTS_DIR: &str = "objects";

/// File holding the id counter
pub const ID_COUNTER_FILE: &str = "id_counter";

/// Extension of document files
pub const DOCUMENT_EXT: &str = "json";

/// Smallest accepted shard width
pub const MIN_SHARD_WIDTH: usize = 1;

/// Largest accepted shard width
pub const MAX_SHARD_WIDTH: usize = 4;

/// Maps document ids to file paths under a store root
#[derive(Debug, Clone)]
pub struct ObjectLayout {
    objects_dir: PathBuf,
    shard_width: usize,
}

impl ObjectLayout {
    /// Layout rooted at `root`. `shard_width` is clamped to the accepted range.
    pub fn new(root: &Path, shard_width: usize) -> Self {
        Self {
            objects_dir: root.join(OBJECTS_DIR),
            shard_width: shard_width.clamp(MIN_SHARD_WIDTH, MAX_SHARD_WIDTH),
        }
    }

    /// Directory holding all shards
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Shard width in hex characters
    pub fn shard_width(&self) -> usize {
        self.shard_width
    }

    /// File path for a document id
    pub fn path_for(&self, id: &DocId) -> PathBuf {
        let digest = format!("{:x}", Sha224::digest(id.canonical_bytes()));
        let (shard, rest) = digest.split_at(self.shard_width);
        self.objects_dir
            .join(shard)
            .join(format!("{}.{}", rest, DOCUMENT_EXT))
    }

    /// True if `path` names a committed document file (not a temp file)
    pub fn is_document_file(path: &Path) -> bool {
        path.extension().map_or(false, |ext| ext == DOCUMENT_EXT)
    }
}
