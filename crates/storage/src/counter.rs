//! Persistent id counter
//!
//! The next auto-generated id lives in `root/id_counter` as a decimal text
//! integer. Allocation is read-increment-persist; callers serialize access
//! through the store lock.

use crate::atomic::write_atomic;
use jsondb_core::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-backed monotonically increasing id source
#[derive(Debug, Clone)]
pub struct IdCounter {
    path: PathBuf,
    sync: bool,
}

impl IdCounter {
    /// Counter stored at `path`. A missing file reads as 0.
    pub fn new(path: impl AsRef<Path>, sync: bool) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync,
        }
    }

    /// Value the next allocation will return
    pub fn peek(&self) -> Result<i64> {
        match fs::read_to_string(&self.path) {
            Ok(text) => text.trim().parse::<i64>().map_err(|e| {
                Error::Serialization(format!(
                    "corrupt id counter '{}': {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the current value and persist its successor
    pub fn allocate(&mut self) -> Result<i64> {
        let current = self.peek()?;
        self.set(current + 1)?;
        debug!(target: "jsondb::store", id = current, "Allocated id");
        Ok(current)
    }

    /// Override the next value
    pub fn set(&mut self, next: i64) -> Result<()> {
        write_atomic(&self.path, next.to_string().as_bytes(), self.sync)?;
        Ok(())
    }
}
