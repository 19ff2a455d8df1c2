//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying pragmas for
//! concurrent access (WAL mode), and running migrations.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// SQLite-backed object store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Every handle is bound to one bucket; objects of other
/// buckets sharing the same file are invisible to it.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    pub(crate) bucket: String,
}

impl CacheDb {
    /// Open a database at the specified path, scoped to `bucket`.
    ///
    /// Creates the file if it doesn't exist, applies pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>, bucket: impl Into<String>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, bucket.into()).await
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory(bucket: impl Into<String>) -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, bucket.into()).await
    }

    async fn init(conn: Connection, bucket: String) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA busy_timeout=5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, bucket })
    }

    /// Bucket this handle reads from and writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Close the underlying connection. Every clone of this handle fails afterwards.
    pub async fn close(&self) -> Result<(), Error> {
        self.conn.clone().close().await.map_err(Error::Database)
    }
}
