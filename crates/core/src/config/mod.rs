//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PDFSNAP_*)
//! 2. Legacy unprefixed variables (STORAGE_BUCKET, DOMAIN_WHITELIST)
//! 3. TOML config file (if PDFSNAP_CONFIG_FILE set)
//! 4. Built-in defaults
//!
//! Configuration is read once at startup and never changes afterwards.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::DomainWhitelist;

mod validation;

pub use validation::ConfigError;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "PDFSNAP_";

/// Variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "PDFSNAP_CONFIG_FILE";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bucket identifier every stored object is scoped to.
    ///
    /// Set via PDFSNAP_STORAGE_BUCKET (or STORAGE_BUCKET). Required.
    #[serde(default)]
    pub storage_bucket: Option<String>,

    /// Domains whose hosts (and subdomains) may be rendered.
    ///
    /// Set via PDFSNAP_DOMAIN_WHITELIST (or DOMAIN_WHITELIST), comma-separated,
    /// or as a TOML array. Required.
    #[serde(default, deserialize_with = "domain_list")]
    pub domain_whitelist: Vec<String>,

    /// Path to the SQLite object store.
    ///
    /// Set via PDFSNAP_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP server binds to.
    ///
    /// Set via PDFSNAP_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Upper bound for launching the browser, loading the page and printing it.
    ///
    /// Set via PDFSNAP_RENDER_TIMEOUT_MS environment variable.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Maximum number of browser instances alive at the same time.
    ///
    /// Set via PDFSNAP_MAX_CONCURRENT_RENDERS environment variable.
    #[serde(default = "default_max_concurrent_renders")]
    pub max_concurrent_renders: usize,

    /// Explicit Chrome/Chromium executable. Auto-detected when unset.
    ///
    /// Set via PDFSNAP_CHROME_EXECUTABLE environment variable.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Launch the browser with `--no-sandbox` (needed in most containers).
    ///
    /// Set via PDFSNAP_NO_SANDBOX environment variable.
    #[serde(default)]
    pub no_sandbox: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Filename announced in the `Content-Disposition` header.
    ///
    /// Set via PDFSNAP_DOWNLOAD_FILENAME environment variable.
    #[serde(default = "default_download_filename")]
    pub download_filename: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./pdfsnap-cache.sqlite")
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_renders() -> usize {
    4
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    800
}

fn default_download_filename() -> String {
    "Export.pdf".into()
}

/// Accept either `"a.com,b.org"` or `["a.com", "b.org"]`.
fn domain_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DomainList {
        Joined(String),
        List(Vec<String>),
    }

    let domains = match DomainList::deserialize(deserializer)? {
        DomainList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        DomainList::List(list) => list,
    };

    Ok(domains
        .into_iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_bucket: None,
            domain_whitelist: Vec::new(),
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            render_timeout_ms: default_render_timeout_ms(),
            max_concurrent_renders: default_max_concurrent_renders(),
            chrome_executable: None,
            no_sandbox: false,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            download_filename: default_download_filename(),
        }
    }
}

impl AppConfig {
    /// Render timeout as Duration for use with tokio.
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// The whitelist as the access gate uses it.
    pub fn whitelist(&self) -> DomainWhitelist {
        DomainWhitelist::new(&self.domain_whitelist)
    }

    /// Layered figment without extraction or validation.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment
            .merge(
                Env::raw()
                    .only(&["STORAGE_BUCKET", "DOMAIN_WHITELIST"])
                    .map(|key| key.as_str().to_lowercase().into()),
            )
            .merge(Env::prefixed(ENV_PREFIX).map(|key| key.as_str().to_lowercase().into()))
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// This is the fail-fast startup step: a service must not start
    /// accepting requests when this returns an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading (including a missing bucket or whitelist)
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The storage bucket, or a `Missing` error naming the variable to set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the bucket is unset or blank.
    pub fn require_storage_bucket(&self) -> Result<&str, ConfigError> {
        self.storage_bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "storage_bucket".into(),
                hint: "Set PDFSNAP_STORAGE_BUCKET (or STORAGE_BUCKET) environment variable".into(),
            })
    }
}
