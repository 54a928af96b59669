//! Index: the single source of truth for declared symbols.
//!
//! Storage follows the primary-table-plus-postings-lists model:
//! - `entries` is the primary store, a `BTreeMap` keyed by [`EntryId`] so
//!   iteration follows insertion order deterministically.
//! - Secondary indexes (`entries_by_name`, `entries_tree`, `entries_by_file`)
//!   hold id buckets, never entry copies, which keeps file-granularity
//!   deletion exact and cheap.
//!
//! Invariant: every stored entry is reachable from its name bucket, from the
//! prefix tree under its name, and from exactly one file bucket (its origin).
//! [`Index::delete`] removes an origin's entries from all three views at
//! once; no entry outlives its origin's removal.
//!
//! The index is a plain mutable structure with no internal synchronization;
//! callers either confine mutation to one owning thread or serialize access
//! with a lock. Queries are read-only and may run concurrently with each
//! other, but not with `add`, `delete`, or `merge`. Bulk indexing exploits
//! per-package independence: each package is indexed into its own private
//! `Index`, and only the final `merge` touches the shared instance.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapter::DeclarationParser;
use crate::cache;
use crate::entry::{strip_root_marker, Entry, EntryId, Visibility, SEPARATOR};
use crate::error::{IndexError, IndexResult};
use crate::indexable::{IndexConfig, IndexablePath};
use crate::trie::PrefixTree;

/// Minimum Jaro-Winkler similarity for a fuzzy-search candidate to qualify.
const FUZZY_THRESHOLD: f64 = 0.7;

// ============================================================================
// Index
// ============================================================================

/// Name-keyed symbol store with scoped, fuzzy, and prefix query support.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    /// Next id to allocate.
    next_entry_id: u32,
    /// Primary storage (BTreeMap for deterministic iteration).
    entries: BTreeMap<EntryId, Entry>,
    /// name → entry ids, in insertion order (redeclaration appends).
    entries_by_name: HashMap<String, Vec<EntryId>>,
    /// Prefix tree over names, mirroring `entries_by_name` buckets.
    entries_tree: PrefixTree<Vec<EntryId>>,
    /// origin path → entry ids that file produced.
    entries_by_file: HashMap<PathBuf, Vec<EntryId>>,
    /// Public require paths, independent of the entry tables.
    require_paths_tree: PrefixTree<IndexablePath>,
    /// origin path → its require path (reverse map for deletion).
    require_path_by_file: HashMap<PathBuf, String>,
}

impl Index {
    /// Create an empty index.
    pub fn new() -> Self {
        Index::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read access to an entry.
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    // ------------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------------

    /// Add a discovered declaration.
    ///
    /// Same-name entries append to the existing bucket; the prefix tree is
    /// re-pointed at the grown bucket so both views stay consistent.
    pub fn add(&mut self, entry: Entry) -> EntryId {
        let id = self.next_entry_id();
        let bucket = self.entries_by_name.entry(entry.name.clone()).or_default();
        bucket.push(id);
        self.entries_tree.insert(&entry.name, bucket.clone());
        self.entries_by_file
            .entry(entry.origin_path.clone())
            .or_default()
            .push(id);
        self.entries.insert(id, entry);
        id
    }

    /// Change the visibility of an already-indexed entry.
    ///
    /// Returns false if the id is unknown (e.g. its origin was deleted).
    pub fn set_visibility(&mut self, id: EntryId, visibility: Visibility) -> bool {
        match self.entries.get_mut(&id) {
            Some(entry) => {
                entry.visibility = visibility;
                true
            }
            None => false,
        }
    }

    /// Remove every entry attributed to `path`, along with the path's
    /// require-path mapping. Deleting an unindexed path is a no-op.
    pub fn delete(&mut self, path: &Path) {
        let ids = self.entries_by_file.remove(path).unwrap_or_default();
        for id in ids {
            let Some(entry) = self.entries.remove(&id) else {
                continue;
            };
            let Some(bucket) = self.entries_by_name.get_mut(&entry.name) else {
                continue;
            };
            bucket.retain(|&member| member != id);
            if bucket.is_empty() {
                self.entries_by_name.remove(&entry.name);
                self.entries_tree.delete(&entry.name);
            } else {
                let shortened = bucket.clone();
                self.entries_tree.insert(&entry.name, shortened);
            }
        }
        if let Some(require_path) = self.require_path_by_file.remove(path) {
            self.require_paths_tree.delete(&require_path);
        }
    }

    /// Union another index into this one.
    ///
    /// Entries are re-added one by one in the other index's insertion order,
    /// so same-name entries across the two sources concatenate — the same
    /// semantics as redeclaration through [`Index::add`]. Ids are
    /// re-allocated in the process. Require-path tries merge with
    /// replace-on-collision (trie semantics).
    pub fn merge(&mut self, other: Index) {
        debug!(entries = other.len(), "merging index");
        for (_, entry) in other.entries {
            self.add(entry);
        }
        self.require_paths_tree.merge(other.require_paths_tree);
        self.require_path_by_file.extend(other.require_path_by_file);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Entries declared under the exact name, in insertion order.
    ///
    /// A leading namespace-root marker (`::Foo`) is stripped first.
    pub fn lookup(&self, name: &str) -> Option<Vec<&Entry>> {
        let name = strip_root_marker(name);
        self.entries_by_name
            .get(name)
            .map(|bucket| self.resolve_bucket(bucket))
    }

    /// Lexical-scope-priority autocomplete.
    ///
    /// `nesting` is the stack of enclosing namespace names at the query
    /// origin, innermost last. Each scope level from innermost to global is
    /// prefix-searched with the qualified candidate name; results are
    /// concatenated most-specific scope first and deduplicated by name,
    /// keeping the first occurrence. Each element of the returned sequence
    /// is one name's bucket.
    pub fn prefix_search(&self, query: &str, nesting: &[String]) -> Vec<Vec<&Entry>> {
        let mut results = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for depth in (0..=nesting.len()).rev() {
            let candidate = Self::qualify(query, &nesting[..depth]);
            for bucket in self.entries_tree.search(&candidate) {
                let Some(name) = self.bucket_name(bucket) else {
                    continue;
                };
                if seen.insert(name) {
                    results.push(self.resolve_bucket(bucket));
                }
            }
        }
        results
    }

    /// Single-answer name resolution.
    ///
    /// Walks the same scope levels as [`Index::prefix_search`], innermost
    /// first, but requires an exact name match and returns the first scope
    /// level's bucket, or `None` when no level matches.
    pub fn resolve(&self, name: &str, nesting: &[String]) -> Option<Vec<&Entry>> {
        for depth in (0..=nesting.len()).rev() {
            let candidate = Self::qualify(name, &nesting[..depth]);
            if let Some(bucket) = self.entries_by_name.get(&candidate) {
                return Some(self.resolve_bucket(bucket));
            }
        }
        None
    }

    /// Typo-tolerant lookup.
    ///
    /// With no query, every entry is returned in insertion order. Otherwise
    /// the query and every candidate name are normalized (separators
    /// stripped, lowercased) and scored with Jaro-Winkler similarity; names
    /// scoring above 0.7 are returned as a flattened entry sequence, best
    /// score first. Equal scores tie-break by name for determinism.
    pub fn fuzzy_search(&self, query: Option<&str>) -> Vec<&Entry> {
        let Some(query) = query else {
            return self.entries.values().collect();
        };
        let needle = normalize(query);
        let mut scored: Vec<(f64, &str, &Vec<EntryId>)> = self
            .entries_by_name
            .iter()
            .filter_map(|(name, bucket)| {
                let similarity = strsim::jaro_winkler(&needle, &normalize(name));
                (similarity > FUZZY_THRESHOLD).then_some((similarity, name.as_str(), bucket))
            })
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });
        scored
            .into_iter()
            .flat_map(|(_, _, bucket)| self.resolve_bucket(bucket))
            .collect()
    }

    /// Prefix search over public require paths.
    pub fn search_require_paths(&self, query: &str) -> Vec<&IndexablePath> {
        self.require_paths_tree.search(query)
    }

    // ------------------------------------------------------------------------
    // Indexing orchestration
    // ------------------------------------------------------------------------

    /// Index one file into `self`.
    ///
    /// When `source` is absent the file is read from disk; a path that is
    /// actually a directory produces no entries and no error. The external
    /// parser supplies the declarations. A declared require path is inserted
    /// into the require-path trie. Returns the number of entries added.
    pub fn index_single(
        &mut self,
        parser: &dyn DeclarationParser,
        path: &IndexablePath,
        source: Option<&str>,
    ) -> IndexResult<usize> {
        let read;
        let source = match source {
            Some(source) => source,
            None => {
                if path.full_path.is_dir() {
                    return Ok(0);
                }
                read = fs::read_to_string(&path.full_path).map_err(|source| IndexError::Read {
                    path: path.full_path.clone(),
                    source,
                })?;
                &read
            }
        };
        let entries = parser.parse(&path.full_path, source)?;
        let count = entries.len();
        for entry in entries {
            self.add(entry);
        }
        if let Some(require_path) = &path.require_path {
            self.require_paths_tree.insert(require_path, path.clone());
            self.require_path_by_file
                .insert(path.full_path.clone(), require_path.clone());
        }
        debug!(path = %path.full_path.display(), entries = count, "indexed file");
        Ok(count)
    }

    /// Index a batch of files, serving dependency packages from cache.
    ///
    /// Workspace-local files (no package) are indexed directly into `self`,
    /// each inside its own failure boundary: a file that fails to read or
    /// parse is recorded in the report and the batch continues. Files owned
    /// by a package are indexed into a private per-package index which is
    /// cached under `config.cache_dir`; an existing artifact with a matching
    /// schema version is deserialized instead of re-parsing the package, and
    /// a corrupt or incompatible artifact is rebuilt from source and
    /// overwritten. Every package index is merged into `self`.
    ///
    /// A package whose build had file errors is merged but **not** persisted:
    /// caching the incomplete index would serve the truncated package with a
    /// clean report on every later run. Such a package is rebuilt (and its
    /// errors re-reported) until it indexes cleanly.
    ///
    /// Fails only when the cache directory itself cannot be prepared.
    pub fn index_all(
        &mut self,
        parser: &dyn DeclarationParser,
        paths: Vec<IndexablePath>,
        config: &IndexConfig,
    ) -> IndexResult<IndexReport> {
        cache::ensure_cache_dir(&config.cache_dir)?;
        let mut report = IndexReport::default();

        // BTreeMap so packages are processed in a stable order.
        let mut packaged: BTreeMap<String, Vec<IndexablePath>> = BTreeMap::new();
        let mut local = Vec::new();
        for path in paths {
            match &path.package {
                Some(package) => packaged.entry(package.clone()).or_default().push(path),
                None => local.push(path),
            }
        }

        for path in &local {
            self.index_file_reported(parser, path, &mut report);
        }

        for (package, files) in packaged {
            let cache_path = config.cache_path(&package);
            if let Some(cached) = Self::load_cached(&cache_path) {
                report.cached_packages.push(package);
                self.merge(cached);
                continue;
            }
            let mut fresh = Index::new();
            let errors_before = report.errors.len();
            for path in &files {
                fresh.index_file_reported(parser, path, &mut report);
            }
            if report.errors.len() > errors_before {
                // An incomplete package index must not be persisted: a cache
                // hit on a later run would mask the missing entries and the
                // error. Merge what we have and rebuild next run.
                warn!(package = %package, "package had file errors, skipping cache write");
            } else {
                match cache::store(&cache_path, &fresh, &package) {
                    Ok(()) => report.refreshed_packages.push(package),
                    Err(error) => {
                        warn!(package = %package, error = %error, "failed to persist package cache");
                        report.errors.push(FileError {
                            path: cache_path.clone(),
                            error: error.into(),
                        });
                    }
                }
            }
            self.merge(fresh);
        }

        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn next_entry_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next_entry_id);
        self.next_entry_id += 1;
        id
    }

    fn resolve_bucket(&self, bucket: &[EntryId]) -> Vec<&Entry> {
        bucket.iter().filter_map(|id| self.entries.get(id)).collect()
    }

    fn bucket_name(&self, bucket: &[EntryId]) -> Option<&str> {
        bucket
            .first()
            .and_then(|id| self.entries.get(id))
            .map(|entry| entry.name.as_str())
    }

    /// Qualify `name` with the first `depth` nesting levels.
    fn qualify(name: &str, nesting: &[String]) -> String {
        if nesting.is_empty() {
            name.to_string()
        } else {
            format!("{}{}{}", nesting.join(SEPARATOR), SEPARATOR, name)
        }
    }

    fn index_file_reported(
        &mut self,
        parser: &dyn DeclarationParser,
        path: &IndexablePath,
        report: &mut IndexReport,
    ) {
        match self.index_single(parser, path, None) {
            Ok(_) => report.indexed_files += 1,
            Err(error) => {
                warn!(path = %path.full_path.display(), error = %error, "failed to index file");
                report.errors.push(FileError {
                    path: path.full_path.clone(),
                    error,
                });
            }
        }
    }

    fn load_cached(cache_path: &Path) -> Option<Index> {
        if !cache_path.exists() {
            return None;
        }
        match cache::load(cache_path) {
            Ok(index) => Some(index),
            Err(error) => {
                // Stale or corrupt artifacts fall back to re-indexing.
                warn!(path = %cache_path.display(), error = %error, "discarding unusable cache");
                None
            }
        }
    }
}

/// Normalize a name for fuzzy comparison: strip separators, lowercase.
fn normalize(name: &str) -> String {
    name.replace(SEPARATOR, "").to_lowercase()
}

// ============================================================================
// Index Report
// ============================================================================

/// Summary of one [`Index::index_all`] run.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Files actually parsed this run (cached packages skip parsing).
    pub indexed_files: usize,
    /// Packages served from an existing cache artifact.
    pub cached_packages: Vec<String>,
    /// Packages indexed from source and (re)persisted this run.
    pub refreshed_packages: Vec<String>,
    /// Per-file failures; the batch continues past each one.
    pub errors: Vec<FileError>,
}

impl IndexReport {
    /// Whether every file indexed cleanly.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A single file's indexing failure.
#[derive(Debug)]
pub struct FileError {
    /// The file (or cache artifact) the failure is attributed to.
    pub path: PathBuf,
    /// What went wrong.
    pub error: IndexError,
}

// ============================================================================
// Tests
// ============================================================================
