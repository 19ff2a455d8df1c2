//! Durable key→blob storage for rendered artifacts.
//!
//! The [`ObjectStore`] trait is the contract the exporter relies on:
//!
//! - `get` returns `Ok(None)` only when the key is absent; every other
//!   failure is an `Err` and is never treated as a cache miss
//! - `put` replaces the whole object in one step (no partial writes are
//!   ever visible); concurrent writers race and the last write wins
//!
//! Two backends are provided: [`CacheDb`] (SQLite via tokio-rusqlite, WAL
//! mode, versioned migrations) and [`MemoryStore`].

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod objects;

use bytes::Bytes;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::{PDF_CONTENT_TYPE, PDF_EXTENSION, compute_cache_key, object_key};
pub use memory::MemoryStore;

/// A stored artifact with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub content_type: String,
    pub body: Bytes,
    /// RFC 3339 timestamp of the write.
    pub stored_at: String,
}

/// Object store contract used by the exporter.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error>;

    /// Store `body` under `key`, replacing any previous object.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), Error>;
}
