//! Chromium-backed engines using chromiumoxide.
//!
//! Each engine is a separate headless browser process with its own
//! throwaway profile directory, so concurrent renders never share state.

use std::path::PathBuf;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, FrameId, PrintToPdfParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::listeners::EventStream;
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use url::Url;

use super::{Engine, EngineLauncher, RenderError, RenderOptions};

/// Lifecycle event fired once the DOM is constructed.
const DOM_CONTENT_LOADED: &str = "DOMContentLoaded";

/// Lifecycle event fired after 500ms without network connections.
const NETWORK_IDLE: &str = "networkIdle";

/// Lifecycle event starting a new navigation in a frame.
const NAVIGATION_INIT: &str = "init";

/// Launches one headless Chrome/Chromium per render.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    executable: Option<PathBuf>,
    no_sandbox: bool,
}

impl ChromiumLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific browser binary instead of auto-detection.
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Launch with `--no-sandbox`.
    pub fn with_no_sandbox(mut self, no_sandbox: bool) -> Self {
        self.no_sandbox = no_sandbox;
        self
    }
}

#[async_trait::async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn acquire(&self, opts: &RenderOptions) -> Result<Box<dyn Engine>, RenderError> {
        let profile = tempfile::Builder::new()
            .prefix("pdfsnap-chrome-")
            .tempdir()
            .map_err(|e| RenderError::BrowserLaunch(format!("profile directory: {e}")))?;

        let (width, height) = opts.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport { width, height, ..Default::default() })
            .user_data_dir(profile.path());
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }

        let (browser, mut handler) = Browser::launch(builder.build().map_err(RenderError::BrowserLaunch)?)
            .await
            .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        tracing::debug!(profile = %profile.path().display(), "launched browser");
        Ok(Box::new(ChromiumEngine { browser, events, _profile: profile }))
    }
}

struct ChromiumEngine {
    browser: Browser,
    events: JoinHandle<()>,
    _profile: TempDir,
}

#[async_trait::async_trait]
impl Engine for ChromiumEngine {
    async fn print_pdf(&mut self, url: &Url, opts: &RenderOptions) -> Result<Vec<u8>, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        page.goto(url.as_str())
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let main_frame = page
            .mainframe()
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;
        wait_until_settled(&mut lifecycle, main_frame.as_ref()).await?;

        let params = PrintToPdfParams { print_background: Some(opts.print_background), ..Default::default() };
        let pdf = page.pdf(params).await.map_err(|e| RenderError::Pdf(e.to_string()))?;

        page.close().await.ok();
        Ok(pdf)
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        let closed = self.browser.close().await;
        self.browser.wait().await.ok();
        self.events.abort();
        closed.map(|_| ()).map_err(|e| RenderError::BrowserLaunch(format!("close: {e}")))
    }

    fn kill(&mut self) {
        // the child process itself is killed when `browser` is dropped
        self.events.abort();
    }
}

/// Consume lifecycle events until the main frame has both built its DOM and
/// gone network-idle within the same navigation.
async fn wait_until_settled(
    events: &mut EventStream<EventLifecycleEvent>, main_frame: Option<&FrameId>,
) -> Result<(), RenderError> {
    let mut dom_ready = false;
    let mut network_idle = false;

    while let Some(event) = events.next().await {
        if main_frame.is_some_and(|frame| *frame != event.frame_id) {
            continue;
        }

        match event.name.as_str() {
            NAVIGATION_INIT => {
                dom_ready = false;
                network_idle = false;
            }
            DOM_CONTENT_LOADED => dom_ready = true,
            NETWORK_IDLE => network_idle = true,
            _ => {}
        }

        if dom_ready && network_idle {
            return Ok(());
        }
    }

    Err(RenderError::BrowserClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Renderer, ScopedRenderer};

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_chromium_launch_and_close() {
        let launcher = ChromiumLauncher::new().with_no_sandbox(true);
        let mut engine = launcher.acquire(&RenderOptions::default()).await.unwrap();
        engine.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires network and Chrome/Chromium"]
    async fn test_render_simple_page() {
        let renderer = ScopedRenderer::new(ChromiumLauncher::new().with_no_sandbox(true), RenderOptions::default());
        let url = Url::parse("https://example.com").unwrap();

        let pdf = renderer.render(&url).await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
