//! In-process object store.
//!
//! Used by tests and by the CLI when no persistent cache is wanted.
//! Contents live as long as the store does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytes::Bytes;
use tokio::sync::RwLock;

use super::{ObjectStore, StoredObject};
use crate::Error;

/// HashMap-backed [`ObjectStore`] that also counts calls.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served so far.
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `put` calls served so far.
    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), Error> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let object = StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        };
        self.objects.write().await.insert(key.to_string(), object);
        Ok(())
    }
}
