//! pdfsnap server entry point.
//!
//! Loads and validates configuration, opens the object store and serves
//! the export route over HTTP. Logs go to stderr as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use pdfsnap_client::{ChromiumLauncher, PdfExporter, RenderOptions, ScopedRenderer};
use pdfsnap_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("refusing to start")?;
    let bucket = config.require_storage_bucket()?.to_string();
    let whitelist = config.whitelist();
    tracing::info!(bucket = %bucket, "Whitelisted domains: {whitelist}");

    let db = CacheDb::open(&config.db_path, bucket)
        .await
        .with_context(|| format!("failed to open object store at {}", config.db_path.display()))?;

    let mut launcher = ChromiumLauncher::new().with_no_sandbox(config.no_sandbox);
    if let Some(path) = &config.chrome_executable {
        launcher = launcher.with_executable(path);
    }
    let renderer = ScopedRenderer::new(
        launcher,
        RenderOptions {
            timeout: config.render_timeout(),
            viewport: (config.viewport_width, config.viewport_height),
            print_background: true,
            max_concurrent: config.max_concurrent_renders,
            ..RenderOptions::default()
        },
    );

    let exporter = PdfExporter::new(whitelist, Arc::new(db.clone()), Arc::new(renderer));
    let state = handler::AppState::new(exporter, &config.download_filename)
        .context("download_filename is not a valid header value")?
        .with_db(db.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "Starting pdfsnap server");

    axum::serve(listener, handler::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = db.close().await {
        tracing::warn!(error = %e, "failed to close object store");
    }
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
