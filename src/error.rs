//! Error types for catalog loading, session persistence and configuration.
//!
//! Matching, scanning and formatting never fail; only the I/O edges of the
//! crate produce these.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuddyError {
    #[error("Failed to read stdin: {0}")]
    StdinRead(#[from] io::Error),

    #[error("Failed to encode output JSON: {0}")]
    OutputEncode(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    OutputWrite(io::Error),

    #[error("Failed to read catalog from {path}: {source}")]
    CatalogRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse catalog: {0}")]
    CatalogParse(String),

    #[error("Catalog not found at {0}")]
    CatalogNotFound(PathBuf),

    #[error("Failed to read config from {path}: {source}")]
    ConfigRead { path: PathBuf, source: io::Error },

    #[error("Failed to parse config {path}: {reason}")]
    ConfigParse { path: PathBuf, reason: String },

    #[error("Failed to read session memory from {path}: {source}")]
    MemoryRead { path: PathBuf, source: io::Error },

    #[error("Failed to write session memory to {path}: {source}")]
    MemoryWrite { path: PathBuf, source: io::Error },

    #[error("Corrupt session memory at {path}: {reason}")]
    MemoryParse { path: PathBuf, reason: String },

    #[error("Failed to read attachment {path}: {source}")]
    AttachmentRead { path: PathBuf, source: io::Error },

    #[error("No topic named {0:?} in the catalog")]
    TopicNotFound(String),

    #[error("Home directory not found")]
    NoHomeDir,
}
