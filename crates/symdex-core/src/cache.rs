//! Per-package cache artifacts.
//!
//! Dependency packages change rarely, so their parsed index is persisted as
//! one JSON artifact per package under the configured cache directory and
//! deserialized on later runs instead of re-parsing every file. Validity is
//! keyed by package identity (the file name) and by [`CACHE_SCHEMA_VERSION`];
//! there is no content-hash staleness check.
//!
//! Artifacts written by an incompatible engine version, or files that fail
//! to deserialize, are reported as errors and rebuilt from source by the
//! caller rather than deserialized into incompatible structures.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::index::Index;

/// Schema version for cache artifacts.
///
/// Increment when the serialized shape of [`Index`] or the artifact envelope
/// changes; readers reject artifacts with a different version.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Artifact Envelope
// ============================================================================

/// On-disk envelope around a serialized package index.
#[derive(Debug, Deserialize)]
struct CacheArtifact {
    /// Must equal [`CACHE_SCHEMA_VERSION`] to be readable.
    #[allow(dead_code)]
    schema_version: u32,
    /// Package identity this artifact was built for.
    package: String,
    /// When the artifact was written (ISO 8601).
    created_at: String,
    /// The four index collections, serialized wholesale.
    index: Index,
}

/// Write-side counterpart of [`CacheArtifact`], borrowing the index.
#[derive(Serialize)]
struct CacheArtifactRef<'a> {
    schema_version: u32,
    package: &'a str,
    created_at: String,
    index: &'a Index,
}

// ============================================================================
// Load / Store
// ============================================================================

/// Load a package index from a cache artifact.
///
/// Rejects artifacts with a mismatched schema version; the caller is
/// expected to rebuild from source and overwrite.
pub fn load(path: &Path) -> CacheResult<Index> {
    let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    // Check the version before deserializing the full index, so a shape
    // change in `Index` still reports as a version mismatch.
    let envelope: VersionProbe =
        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    if envelope.schema_version != CACHE_SCHEMA_VERSION {
        return Err(CacheError::SchemaMismatch {
            path: path.to_path_buf(),
            found: envelope.schema_version,
            expected: CACHE_SCHEMA_VERSION,
        });
    }
    let artifact: CacheArtifact =
        serde_json::from_str(&content).map_err(|source| CacheError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(
        path = %path.display(),
        package = %artifact.package,
        created_at = %artifact.created_at,
        "loaded package cache"
    );
    Ok(artifact.index)
}

/// Minimal probe deserialization used to check the version first.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    schema_version: u32,
}

/// Persist a package index as a cache artifact.
pub fn store(path: &Path, index: &Index, package: &str) -> CacheResult<()> {
    let artifact = CacheArtifactRef {
        schema_version: CACHE_SCHEMA_VERSION,
        package,
        created_at: format_timestamp(SystemTime::now()),
        index,
    };
    let content = serde_json::to_string(&artifact).map_err(CacheError::Serialize)?;
    atomic_write(path, content.as_bytes()).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), package = %package, "persisted package cache");
    Ok(())
}

// ============================================================================
// Cache Directory
// ============================================================================

/// Create the cache directory if needed, with a `.gitignore` marker that
/// keeps the whole directory out of version control.
pub fn ensure_cache_dir(dir: &Path) -> CacheResult<()> {
    fs::create_dir_all(dir).map_err(|source| CacheError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let marker = dir.join(".gitignore");
    if !marker.exists() {
        fs::write(&marker, "*\n").map_err(|source| CacheError::Io {
            path: marker.clone(),
            source,
        })?;
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Write content to a file atomically using temp + rename, so readers see
/// either the old artifact or the new one, never a partial write.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    use std::time::UNIX_EPOCH;

    let pid = std::process::id();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        pid,
        timestamp
    ));
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Format a timestamp for the artifact envelope (ISO 8601).
fn format_timestamp(time: SystemTime) -> String {
    use chrono::{DateTime, Utc};

    let datetime: DateTime<Utc> = time.into();
    datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, EntryKind, Location};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sample_index() -> Index {
        let mut index = Index::new();
        index.add(Entry::new(
            "Acme::Client",
            EntryKind::Class,
            "/deps/acme/lib/client.src",
            Location::new(1, 1, 10, 4),
        ));
        index.add(Entry::new(
            "Acme::VERSION",
            EntryKind::Constant,
            "/deps/acme/lib/version.src",
            Location::new(2, 3, 2, 25),
        ));
        index
    }

    mod roundtrip_tests {
        use super::*;

        #[test]
        fn store_then_load_preserves_all_views() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("acme.json");
            store(&path, &sample_index(), "acme-1.2.0").unwrap();

            let loaded = load(&path).unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded.lookup("Acme::Client").unwrap().len(), 1);
            assert_eq!(loaded.prefix_search("Acme::", &[]).len(), 2);
        }

        #[test]
        fn store_overwrites_previous_artifact() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("acme.json");
            store(&path, &sample_index(), "acme-1.2.0").unwrap();
            store(&path, &Index::new(), "acme-1.2.0").unwrap();
            assert!(load(&path).unwrap().is_empty());
        }
    }

    mod failure_tests {
        use super::*;

        #[test]
        fn corrupt_artifact_is_reported_as_corrupt() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("acme.json");
            fs::write(&path, "{ not json").unwrap();
            assert!(matches!(load(&path), Err(CacheError::Corrupt { .. })));
        }

        #[test]
        fn version_mismatch_is_rejected() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("acme.json");
            let stale = format!(
                r#"{{"schema_version":{},"package":"acme","created_at":"","index":{{}}}}"#,
                CACHE_SCHEMA_VERSION + 1
            );
            fs::write(&path, stale).unwrap();
            match load(&path) {
                Err(CacheError::SchemaMismatch { found, expected, .. }) => {
                    assert_eq!(found, CACHE_SCHEMA_VERSION + 1);
                    assert_eq!(expected, CACHE_SCHEMA_VERSION);
                }
                other => panic!("expected schema mismatch, got {other:?}"),
            }
        }

        #[test]
        fn missing_artifact_is_an_io_error() {
            let err = load(&PathBuf::from("/nonexistent/cache.json")).unwrap_err();
            assert!(matches!(err, CacheError::Io { .. }));
        }
    }

    mod cache_dir_tests {
        use super::*;

        #[test]
        fn ensure_cache_dir_writes_gitignore_marker() {
            let dir = TempDir::new().unwrap();
            let cache_dir = dir.path().join("cache");
            ensure_cache_dir(&cache_dir).unwrap();
            assert_eq!(fs::read_to_string(cache_dir.join(".gitignore")).unwrap(), "*\n");
        }

        #[test]
        fn ensure_cache_dir_is_idempotent() {
            let dir = TempDir::new().unwrap();
            let cache_dir = dir.path().join("cache");
            ensure_cache_dir(&cache_dir).unwrap();
            ensure_cache_dir(&cache_dir).unwrap();
            assert!(cache_dir.is_dir());
        }
    }
}
