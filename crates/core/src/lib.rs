//! Core types for jsondb
//!
//! This crate defines the foundational types used throughout the system:
//! - DocId: Document identifier (store-generated integer or caller-supplied string)
//! - Document: JSON object with reserved `_id` / `_rev` fields
//! - Key: View key with a total order over heterogeneous values
//! - TieBreak / IndexKey: `(key, id)` composite ordering for index rows
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod key;

pub use document::{DocId, Document, ID_FIELD, REV_FIELD};
pub use error::{Error, Result};
pub use key::{IndexKey, Key, TieBreak};
