//! Headless browser rendering of URLs to PDF.
//!
//! Every render gets its own browser instance. [`ScopedRenderer`] owns
//! the lifecycle:
//!
//! 1. wait for a free slot (bounded by `max_concurrent`)
//! 2. acquire an engine from the [`EngineLauncher`]
//! 3. navigate and print, all under one timeout
//! 4. release the engine with [`Engine::close`] on every outcome, killing
//!    it if the close does not finish within `release_timeout`
//!
//! If the render future is dropped before step 4 (the caller went away),
//! the engine is killed from `Drop` instead.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

#[cfg(feature = "render")]
mod chromium;

#[cfg(feature = "render")]
pub use chromium::ChromiumLauncher;

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Page loaded but printing it failed.
    #[error("pdf generation failed: {0}")]
    Pdf(String),

    /// Timeout waiting for page to load.
    #[error("render timeout after {0}ms")]
    Timeout(u64),

    /// Browser closed unexpectedly.
    #[error("browser closed unexpectedly")]
    BrowserClosed,
}

impl From<RenderError> for pdfsnap_core::Error {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Timeout(ms) => pdfsnap_core::Error::RenderTimeout(ms),
            other => pdfsnap_core::Error::RenderFailed(other.to_string()),
        }
    }
}

/// Options applied to every render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Covers launch, navigation and printing (default: 30s).
    pub timeout: Duration,

    /// Viewport dimensions (default: 1280x800).
    pub viewport: (u32, u32),

    /// Print CSS backgrounds (default: true).
    pub print_background: bool,

    /// Maximum number of engines alive at once (default: 4).
    pub max_concurrent: usize,

    /// Bound on a clean engine shutdown before it is killed (default: 5s).
    pub release_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            viewport: (1280, 800),
            print_background: true,
            max_concurrent: 4,
            release_timeout: Duration::from_secs(5),
        }
    }
}

impl RenderOptions {
    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Renderer trait: turn a URL into PDF bytes.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &Url) -> Result<Bytes, RenderError>;
}

/// One acquired browser instance.
#[async_trait::async_trait]
pub trait Engine: Send {
    /// Navigate to `url`, wait until the page has settled and print it.
    async fn print_pdf(&mut self, url: &Url, opts: &RenderOptions) -> Result<Vec<u8>, RenderError>;

    /// Shut the instance down cleanly.
    async fn close(&mut self) -> Result<(), RenderError>;

    /// Tear the instance down without awaiting anything. Used when `close`
    /// hangs and from `Drop`.
    fn kill(&mut self);
}

/// Source of fresh engines.
#[async_trait::async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn acquire(&self, opts: &RenderOptions) -> Result<Box<dyn Engine>, RenderError>;
}

/// Holds an engine until it is released; kills it if dropped while still held.
struct EngineGuard {
    engine: Option<Box<dyn Engine>>,
}

impl EngineGuard {
    fn empty() -> Self {
        Self { engine: None }
    }

    async fn release(&mut self, limit: Duration) {
        // stays in the guard while closing so a cancelled close still kills it
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        match tokio::time::timeout(limit, engine.close()).await {
            Ok(result) => {
                self.engine = None;
                if let Err(e) = result {
                    tracing::warn!(error = %e, "failed to close browser cleanly");
                }
            }
            Err(_) => {
                tracing::warn!(limit_ms = limit.as_millis() as u64, "browser did not close in time, killing it");
                if let Some(mut engine) = self.engine.take() {
                    engine.kill();
                }
            }
        }
    }
}

impl Drop for EngineGuard {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            tracing::warn!("render abandoned before completion, killing browser");
            engine.kill();
        }
    }
}

/// [`Renderer`] that acquires a fresh engine per call and always releases it.
pub struct ScopedRenderer<L> {
    launcher: L,
    options: RenderOptions,
    slots: Arc<Semaphore>,
}

impl<L: EngineLauncher> ScopedRenderer<L> {
    pub fn new(launcher: L, options: RenderOptions) -> Self {
        let slots = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
        Self { launcher, options, slots }
    }
}

#[async_trait::async_trait]
impl<L: EngineLauncher> Renderer for ScopedRenderer<L> {
    async fn render(&self, url: &Url) -> Result<Bytes, RenderError> {
        let _slot = self.slots.acquire().await.map_err(|_| RenderError::BrowserClosed)?;
        let start = std::time::Instant::now();

        let mut guard = EngineGuard::empty();
        let outcome = tokio::time::timeout(self.options.timeout, async {
            let engine = guard.engine.insert(self.launcher.acquire(&self.options).await?);
            Ok::<_, RenderError>(engine.print_pdf(url, &self.options).await?)
        })
        .await;

        guard.release(self.options.release_timeout).await;

        let pdf = match outcome {
            Ok(result) => result?,
            Err(_) => return Err(RenderError::Timeout(self.options.timeout_ms())),
        };

        tracing::debug!(url = %url, bytes = pdf.len(), elapsed_ms = start.elapsed().as_millis() as u64, "rendered pdf");
        Ok(Bytes::from(pdf))
    }
}
