//! End-to-end indexing flow: bulk runs, package caching, fault isolation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;

use symdex_core::adapter::{DeclarationParser, ParseError};
use symdex_core::entry::{Entry, EntryKind, Location};
use symdex_core::index::Index;
use symdex_core::indexable::{IndexConfig, IndexablePath};

// ============================================================================
// Toy Parser
// ============================================================================

/// Line-oriented declaration parser for tests: each non-empty line is
/// `module NAME`, `class NAME`, or `constant NAME`.
#[derive(Default)]
struct LineParser {
    parsed_files: AtomicUsize,
}

impl LineParser {
    fn parsed_files(&self) -> usize {
        self.parsed_files.load(Ordering::SeqCst)
    }
}

impl DeclarationParser for LineParser {
    fn parse(&self, path: &Path, source: &str) -> Result<Vec<Entry>, ParseError> {
        self.parsed_files.fetch_add(1, Ordering::SeqCst);
        let mut entries = Vec::new();
        for (line_index, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (keyword, name) = line
                .split_once(' ')
                .ok_or_else(|| ParseError::new(path, format!("malformed line {}", line_index + 1)))?;
            let kind = match keyword {
                "module" => EntryKind::Module,
                "class" => EntryKind::Class,
                "constant" => EntryKind::Constant,
                other => {
                    return Err(ParseError::new(path, format!("unknown keyword {other:?}")));
                }
            };
            let line_number = line_index as u32 + 1;
            entries.push(Entry::new(
                name,
                kind,
                path,
                Location::new(line_number, 1, line_number, line.len() as u32 + 1),
            ));
        }
        Ok(entries)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Fixture {
    /// Keeps the temp workspace alive for the duration of the test.
    dir: TempDir,
    config: IndexConfig,
    paths: Vec<IndexablePath>,
}

/// A workspace with two local files plus one two-file dependency package.
fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let app = write_file(root, "app/models.src", "class App::Model\nconstant App::VERSION\n");
    let util = write_file(root, "app/util.src", "module App::Util\n");
    let client = write_file(
        root,
        "deps/acme/client.src",
        "class Acme::Client\nmodule Acme\n",
    );
    let server = write_file(root, "deps/acme/server.src", "class Acme::Server\n");

    let config = IndexConfig::new(root.join("cache"));
    let paths = vec![
        IndexablePath::new(app),
        IndexablePath::new(util),
        IndexablePath::new(client)
            .with_package("acme-1.0.0")
            .with_require_path("acme/client"),
        IndexablePath::new(server)
            .with_package("acme-1.0.0")
            .with_require_path("acme/server"),
    ];
    Fixture { dir, config, paths }
}

fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn index_all_indexes_workspace_and_package_files() {
    let fixture = fixture();
    let parser = LineParser::default();
    let mut index = Index::new();

    let report = index
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(report.indexed_files, 4);
    assert_eq!(report.refreshed_packages, vec!["acme-1.0.0".to_string()]);
    assert!(report.cached_packages.is_empty());

    assert_eq!(index.lookup("App::Model").unwrap().len(), 1);
    assert_eq!(index.lookup("Acme::Client").unwrap().len(), 1);
    let require_matches = index.search_require_paths("acme/");
    assert_eq!(require_matches.len(), 2);
}

#[test]
fn second_run_serves_the_package_from_cache() {
    let fixture = fixture();
    let parser = LineParser::default();

    let mut first = Index::new();
    first
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();
    assert_eq!(parser.parsed_files(), 4);

    let mut second = Index::new();
    let report = second
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();

    // Only the two workspace files were re-parsed.
    assert_eq!(parser.parsed_files(), 6);
    assert_eq!(report.cached_packages, vec!["acme-1.0.0".to_string()]);
    assert!(report.refreshed_packages.is_empty());
    assert_eq!(second.lookup("Acme::Server").unwrap().len(), 1);
    assert_eq!(second.search_require_paths("acme/").len(), 2);
}

#[test]
fn corrupt_cache_is_rebuilt_from_source() {
    let fixture = fixture();
    let parser = LineParser::default();

    let mut first = Index::new();
    first
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();

    let cache_path = fixture.config.cache_path("acme-1.0.0");
    fs::write(&cache_path, "not json at all").unwrap();

    let mut second = Index::new();
    let report = second
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();

    assert_eq!(report.refreshed_packages, vec!["acme-1.0.0".to_string()]);
    assert_eq!(second.lookup("Acme::Client").unwrap().len(), 1);

    // The rebuilt artifact is usable again on the next run.
    let mut third = Index::new();
    let report = third
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();
    assert_eq!(report.cached_packages, vec!["acme-1.0.0".to_string()]);
}

#[test]
fn a_failing_file_does_not_abort_the_batch() {
    let fixture = fixture();
    let bad = write_file(fixture.dir.path(), "app/broken.src", "garbage\n");
    let mut paths = fixture.paths.clone();
    paths.insert(0, IndexablePath::new(bad.clone()));

    let parser = LineParser::default();
    let mut index = Index::new();
    let report = index.index_all(&parser, paths, &fixture.config).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, bad);
    // Everything after the failure still landed in the index.
    assert_eq!(report.indexed_files, 4);
    assert_eq!(index.lookup("App::Model").unwrap().len(), 1);
    assert_eq!(index.lookup("Acme::Client").unwrap().len(), 1);
}

#[test]
fn package_with_a_broken_file_is_not_cached_until_it_indexes_cleanly() {
    let fixture = fixture();
    let broken = fixture.dir.path().join("deps/acme/client.src");
    fs::write(&broken, "garbage\n").unwrap();

    let parser = LineParser::default();
    let mut first = Index::new();
    let report = first
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();

    // The failure is reported and the incomplete package index is merged,
    // but no artifact is written for it.
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, broken);
    assert!(report.refreshed_packages.is_empty());
    assert!(!fixture.config.cache_path("acme-1.0.0").exists());
    assert_eq!(first.lookup("Acme::Server").unwrap().len(), 1);
    assert!(first.lookup("Acme::Client").is_none());

    // After the file is fixed, the next run rebuilds the package from
    // source instead of serving a truncated cache with a clean report.
    fs::write(&broken, "class Acme::Client\n").unwrap();
    let mut second = Index::new();
    let report = second
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(report.refreshed_packages, vec!["acme-1.0.0".to_string()]);
    assert_eq!(second.lookup("Acme::Client").unwrap().len(), 1);

    // The artifact written by the clean rebuild is complete.
    let mut third = Index::new();
    let report = third
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();
    assert_eq!(report.cached_packages, vec!["acme-1.0.0".to_string()]);
    assert_eq!(third.lookup("Acme::Client").unwrap().len(), 1);
}

#[test]
fn missing_file_is_reported_and_skipped() {
    let fixture = fixture();
    let mut paths = fixture.paths.clone();
    paths.push(IndexablePath::new(fixture.dir.path().join("app/gone.src")));

    let parser = LineParser::default();
    let mut index = Index::new();
    let report = index.index_all(&parser, paths, &fixture.config).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.indexed_files, 4);
}

#[test]
fn indexing_a_directory_produces_nothing() {
    let fixture = fixture();
    let parser = LineParser::default();
    let mut index = Index::new();

    let count = index
        .index_single(&parser, &IndexablePath::new(fixture.dir.path().join("app")), None)
        .unwrap();

    assert_eq!(count, 0);
    assert_eq!(parser.parsed_files(), 0);
    assert!(index.is_empty());
}

#[test]
fn index_single_accepts_in_memory_source() {
    let parser = LineParser::default();
    let mut index = Index::new();
    let path = IndexablePath::new("/virtual/editor-buffer.src");

    let count = index
        .index_single(&parser, &path, Some("class Unsaved::Change\n"))
        .unwrap();

    assert_eq!(count, 1);
    assert_eq!(index.lookup("Unsaved::Change").unwrap().len(), 1);
}

#[test]
fn cache_directory_carries_a_gitignore_marker() {
    let fixture = fixture();
    let parser = LineParser::default();
    let mut index = Index::new();
    index
        .index_all(&parser, fixture.paths.clone(), &fixture.config)
        .unwrap();

    let marker = fixture.config.cache_dir.join(".gitignore");
    assert_eq!(fs::read_to_string(marker).unwrap(), "*\n");
}
