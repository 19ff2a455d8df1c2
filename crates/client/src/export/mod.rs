//! URL → PDF export through the artifact cache.
//!
//! Per request:
//!
//! 1. the whitelist check runs first; a rejected URL touches nothing else
//! 2. the object key is derived from the URL string as given
//! 3. unless `force` is set, the store is consulted; a hit is served as is,
//!    a store failure other than "not found" fails the request
//! 4. on a miss (or when forced) the page is rendered and the bytes are
//!    written back; a failed write is reported on the artifact, and the
//!    freshly rendered bytes are still returned
//!
//! There is no per-key coordination: concurrent misses for the same URL
//! each render and each write, and the last write wins.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use pdfsnap_core::cache::{PDF_CONTENT_TYPE, object_key};
use pdfsnap_core::{DomainWhitelist, Error, ObjectStore};

use crate::render::Renderer;

/// Where the returned bytes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the store.
    Hit,
    /// Not stored yet; rendered now.
    Miss,
    /// Lookup skipped by `force`; rendered now and overwritten.
    Refresh,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Refresh => "REFRESH",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful export.
#[derive(Debug)]
pub struct PdfArtifact {
    /// Object key (`<hex-digest>.pdf`).
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub status: CacheStatus,
    /// Set when rendering succeeded but writing the result back failed.
    pub persist_error: Option<Error>,
}

/// Coordinates whitelist, cache lookup, rendering and write-back.
#[derive(Clone)]
pub struct PdfExporter {
    whitelist: DomainWhitelist,
    store: Arc<dyn ObjectStore>,
    renderer: Arc<dyn Renderer>,
}

impl PdfExporter {
    pub fn new(whitelist: DomainWhitelist, store: Arc<dyn ObjectStore>, renderer: Arc<dyn Renderer>) -> Self {
        Self { whitelist, store, renderer }
    }

    /// Export `url` as a PDF, from the cache when possible.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidUrl` / `Error::NotWhitelisted` before any I/O
    /// - the store's error if the lookup fails for a reason other than a missing key
    /// - `Error::RenderFailed` / `Error::RenderTimeout` if rendering fails; nothing is written
    pub async fn export(&self, url: &str, force: bool) -> Result<PdfArtifact, Error> {
        let target = self.whitelist.authorize(url).inspect_err(|e| {
            tracing::debug!(url, error = %e, "export rejected");
        })?;

        let key = object_key(url);

        if !force {
            if let Some(object) = self.store.get(&key).await? {
                tracing::debug!(url, key = %key, bytes = object.body.len(), "cache hit");
                return Ok(PdfArtifact {
                    key,
                    body: object.body,
                    content_type: object.content_type,
                    status: CacheStatus::Hit,
                    persist_error: None,
                });
            }
            tracing::debug!(url, key = %key, "cache miss");
        }

        let status = if force { CacheStatus::Refresh } else { CacheStatus::Miss };
        let body = self.renderer.render(&target).await?;

        let persist_error = match self.store.put(&key, body.clone(), PDF_CONTENT_TYPE).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(url, key = %key, error = %e, "failed to cache rendered pdf");
                Some(e)
            }
        };

        tracing::info!(url, key = %key, status = %status, bytes = body.len(), "rendered pdf");

        Ok(PdfArtifact { key, body, content_type: PDF_CONTENT_TYPE.to_string(), status, persist_error })
    }
}
