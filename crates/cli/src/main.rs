//! `pdfsnap` command-line tool.
//!
//! Operator helpers around the export cache: derive object keys, test URLs
//! against the configured whitelist, and export a page to a local file
//! through the same cache the server uses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfsnap_client::{ChromiumLauncher, PdfExporter, RenderOptions, ScopedRenderer};
use pdfsnap_core::cache::object_key;
use pdfsnap_core::{AppConfig, CacheDb, DomainWhitelist, MemoryStore, ObjectStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pdfsnap", version, about = "Render whitelisted pages to cached PDFs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the object key a URL is cached under.
    Key {
        /// URL exactly as it would be requested.
        url: String,
    },

    /// Check a URL against the configured domain whitelist.
    Check { url: String },

    /// Export a URL to a local PDF file.
    Export {
        url: String,

        /// Re-render even when a cached copy exists.
        #[arg(long)]
        force: bool,

        /// Output file.
        #[arg(short, long, default_value = "Export.pdf")]
        output: PathBuf,

        /// Use a throwaway in-memory store instead of the configured database.
        #[arg(long)]
        no_cache: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match Cli::parse().command {
        Command::Key { url } => {
            println!("{}", object_key(&url));
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { url } => check(&url),
        Command::Export { url, force, output, no_cache } => export(&url, force, &output, no_cache).await,
    }
}

fn check(url: &str) -> Result<ExitCode> {
    let config = AppConfig::load().context("invalid configuration")?;
    Ok(check_against(&config.whitelist(), url))
}

fn check_against(whitelist: &DomainWhitelist, url: &str) -> ExitCode {
    match whitelist.authorize(url) {
        Ok(_) => {
            println!("allowed: {url}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("denied: {}", e.message());
            ExitCode::FAILURE
        }
    }
}

async fn export(url: &str, force: bool, output: &Path, no_cache: bool) -> Result<ExitCode> {
    let config = AppConfig::load().context("invalid configuration")?;

    let store: Arc<dyn ObjectStore> = if no_cache {
        Arc::new(MemoryStore::new())
    } else {
        let bucket = config.require_storage_bucket()?.to_string();
        Arc::new(CacheDb::open(&config.db_path, bucket).await?)
    };

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
            max_concurrent: 1,
            ..RenderOptions::default()
        },
    );

    let exporter = PdfExporter::new(config.whitelist(), store, Arc::new(renderer));
    let artifact = exporter.export(url, force).await?;

    tokio::fs::write(output, &artifact.body)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    eprintln!("{} {} ({} bytes, {})", artifact.status, output.display(), artifact.body.len(), artifact.key);
    if let Some(e) = artifact.persist_error {
        eprintln!("warning: result was not cached: {}", e.message());
    }

    Ok(ExitCode::SUCCESS)
}
