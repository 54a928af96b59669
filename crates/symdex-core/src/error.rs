//! Error types for indexing and cache operations.
//!
//! Removal and union operations on the index never fail on missing keys;
//! errors here cover the boundaries that touch the outside world: reading
//! source files, the pluggable parser, and the package cache.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use crate::adapter::ParseError;

// ============================================================================
// Index Errors
// ============================================================================

/// Error raised while indexing a file.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external parser rejected the file content.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A cache operation failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type for indexing operations.
pub type IndexResult<T> = Result<T, IndexError>;

// ============================================================================
// Cache Errors
// ============================================================================

/// Error raised while reading or writing a package cache artifact.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error while touching the cache directory or a cache file.
    #[error("cache IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cache file is not valid JSON for the current artifact shape.
    #[error("cache file is corrupt: {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The cache file was written by an incompatible version of the engine.
    #[error("cache schema mismatch in {path}: found version {found}, expected {expected}")]
    SchemaMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    /// JSON serialization failed while writing an artifact.
    #[error("cache serialization error: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

// ============================================================================
// Tests
// ============================================================================
