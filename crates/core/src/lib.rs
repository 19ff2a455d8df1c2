//! Core types and shared functionality for pdfsnap.
//!
//! This crate provides:
//! - Object store contract with SQLite and in-memory backends
//! - Cache key derivation
//! - Domain whitelist (the access gate)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod whitelist;

pub use cache::{CacheDb, MemoryStore, ObjectStore, StoredObject};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use whitelist::DomainWhitelist;
