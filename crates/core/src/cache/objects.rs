//! Object reads and writes on the SQLite backend.

use bytes::Bytes;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::{ObjectStore, StoredObject};
use crate::Error;

impl CacheDb {
    /// Get an object by key.
    ///
    /// Returns None if the key doesn't exist in this bucket.
    pub async fn get_object(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<StoredObject>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, content_type, body, stored_at
                     FROM objects WHERE bucket = ?1 AND key = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key], |row| {
                    Ok(StoredObject {
                        key: row.get(0)?,
                        content_type: row.get(1)?,
                        body: Bytes::from(row.get::<_, Vec<u8>>(2)?),
                        stored_at: row.get(3)?,
                    })
                });

                match result {
                    Ok(object) => Ok(Some(object)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an object.
    ///
    /// A single UPSERT statement, so readers see either the old body or the
    /// new one in full.
    pub async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), Error> {
        let bucket = self.bucket.clone();
        let key = key.to_string();
        let content_type = content_type.to_string();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO objects (bucket, key, content_type, body, size, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(bucket, key) DO UPDATE SET
                        content_type = excluded.content_type,
                        body = excluded.body,
                        size = excluded.size,
                        stored_at = excluded.stored_at",
                    params![bucket, key, content_type, &body[..], body.len() as i64, stored_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Number of objects in this bucket.
    pub async fn count_objects(&self) -> Result<u64, Error> {
        let bucket = self.bucket.clone();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM objects WHERE bucket = ?1", params![bucket], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait::async_trait]
impl ObjectStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        self.get_object(key).await
    }

    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), Error> {
        self.put_object(key, body, content_type).await
    }
}
