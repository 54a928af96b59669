//! Indexable file descriptors and indexing configuration.
//!
//! An [`IndexablePath`] routes one file into direct or cached indexing:
//! workspace-local files (no package) are indexed straight into the shared
//! index, while files owned by a dependency package are indexed into a
//! per-package index that is cached on disk, keyed by package identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

// ============================================================================
// Indexable Path
// ============================================================================

/// A file to be indexed, with its package and import metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexablePath {
    /// Absolute path to the source file.
    pub full_path: PathBuf,
    /// Identity of the owning package (`name-version`), or `None` for
    /// workspace-local files.
    pub package: Option<String>,
    /// Public require path for import autocompletion, if the file declares
    /// one.
    pub require_path: Option<String>,
}

impl IndexablePath {
    /// Create a workspace-local indexable path.
    pub fn new(full_path: impl Into<PathBuf>) -> Self {
        IndexablePath {
            full_path: full_path.into(),
            package: None,
            require_path: None,
        }
    }

    /// Attribute this file to a package.
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Declare the public require path of this file.
    pub fn with_require_path(mut self, require_path: impl Into<String>) -> Self {
        self.require_path = Some(require_path.into());
        self
    }

    /// Cache file name for this file's package, or `None` for
    /// workspace-local files.
    pub fn cache_file_name(&self) -> Option<String> {
        self.package.as_deref().map(cache_file_name)
    }
}

/// Derive the cache file name for a package identity.
///
/// Stable per package: the same identity always maps to the same file. The
/// sanitized identity keeps the name readable; the hash suffix keeps it
/// collision-free across identities that sanitize identically.
pub fn cache_file_name(package: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(package.as_bytes());
    let digest = hasher.finalize();
    let sanitized: String = package
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    format!("{}-{}.json", sanitized, hex::encode(&digest[..8]))
}

// ============================================================================
// Index Configuration
// ============================================================================

/// Configuration for bulk indexing.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Directory holding per-package cache artifacts. Created on first use,
    /// with a `.gitignore` marker so it stays out of version control.
    pub cache_dir: PathBuf,
}

impl IndexConfig {
    /// Create a configuration with the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        IndexConfig {
            cache_dir: cache_dir.into(),
        }
    }

    /// Full path of the cache artifact for a package identity.
    pub fn cache_path(&self, package: &str) -> PathBuf {
        self.cache_dir.join(cache_file_name(package))
    }
}

// ============================================================================
// Tests
// ============================================================================
