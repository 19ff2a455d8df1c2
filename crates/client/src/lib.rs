//! Client code for pdfsnap.
//!
//! This crate provides the headless-browser renderer and the exporter that
//! puts the whitelist, the artifact cache and the renderer together. It is
//! shared by the server and the CLI.

pub mod export;
pub mod render;

pub use export::{CacheStatus, PdfArtifact, PdfExporter};

#[cfg(feature = "render")]
pub use render::ChromiumLauncher;
pub use render::{Engine, EngineLauncher, RenderError, RenderOptions, Renderer, ScopedRenderer};
