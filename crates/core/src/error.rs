//! Error types for jsondb
//!
//! Every fallible operation in the workspace returns [`Result`], whose error
//! side is the single [`Error`] enum defined here. We use `thiserror` for the
//! `Display` and `Error` implementations.

use crate::document::DocId;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for jsondb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the document store and view engine
#[derive(Debug, Error)]
pub enum Error {
    /// No document with this id exists
    #[error("Document not found: {0}")]
    NotFound(DocId),

    /// Optimistic concurrency check failed on save
    #[error("Revision conflict on {id}: expected {}, stored {actual}", fmt_rev(.expected))]
    Conflict {
        /// Id of the document being saved
        id: DocId,
        /// Revision carried by the incoming document (None if omitted)
        expected: Option<u64>,
        /// Revision currently stored
        actual: u64,
    },

    /// Query arguments are malformed or refer to an unknown view
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Requested behavior is not supported
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Document content violates the document model
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// View exists but its index has never been built successfully
    #[error("View is not ready: {0}")]
    ViewNotReady(String),

    /// Configuration file could not be read or holds invalid values
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store root is already owned by another open handle
    #[error("Store at '{}' is already in use", .0.display())]
    Locked(PathBuf),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn fmt_rev(rev: &Option<u64>) -> String {
    match rev {
        Some(r) => r.to_string(),
        None => "none".to_string(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True for [`Error::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True for [`Error::Conflict`]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}
