//! Entry model: value objects for discovered declarations.
//!
//! An [`Entry`] records one declaration found while scanning a source tree:
//! its fully qualified name, the file it came from, its source range, attached
//! documentation, visibility, and kind. Names are unique only in combination
//! with their origin file — reopened namespaces produce one entry per file.
//!
//! Entries are stored in the [`Index`](crate::index::Index) under stable
//! [`EntryId`]s; secondary indexes hold ids, never entry copies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator between segments of a fully qualified name.
pub const SEPARATOR: &str = "::";

// ============================================================================
// ID Type
// ============================================================================

/// Unique identifier for an entry within an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntryId(pub u32);

impl EntryId {
    /// Create a new entry ID.
    pub fn new(id: u32) -> Self {
        EntryId(id)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry_{}", self.0)
    }
}

// ============================================================================
// Location
// ============================================================================

/// Source range of a declaration (1-indexed lines and columns).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Line where the declaration starts (1-indexed).
    pub start_line: u32,
    /// Column where the declaration starts (1-indexed).
    pub start_column: u32,
    /// Line where the declaration ends (1-indexed).
    pub end_line: u32,
    /// Column where the declaration ends (1-indexed).
    pub end_column: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Location {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line, self.start_column, self.end_line, self.end_column
        )
    }
}

// ============================================================================
// Visibility
// ============================================================================

/// Access level of a declaration.
///
/// Mutable after creation: a later declaration (e.g. an access modifier) may
/// change the visibility of an already-indexed entry via
/// [`Index::set_visibility`](crate::index::Index::set_visibility).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Accessible from anywhere.
    Public,
    /// Accessible from the declaring namespace and its subtypes.
    Protected,
    /// Accessible only from the declaring namespace.
    Private,
}

// ============================================================================
// Entry Kind
// ============================================================================

/// What kind of declaration an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A module declaration (namespace).
    Module,
    /// A class declaration (namespace).
    Class,
    /// A constant assignment.
    Constant,
}

impl EntryKind {
    /// Whether entries of this kind can contain other entries.
    pub fn is_namespace(&self) -> bool {
        matches!(self, EntryKind::Module | EntryKind::Class)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Module => write!(f, "module"),
            EntryKind::Class => write!(f, "class"),
            EntryKind::Constant => write!(f, "constant"),
        }
    }
}

// ============================================================================
// Entry
// ============================================================================

/// A discovered declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Fully qualified name (`Foo::Bar::BAZ`).
    pub name: String,
    /// What kind of declaration this is.
    pub kind: EntryKind,
    /// Source file that produced this entry.
    pub origin_path: PathBuf,
    /// Source range of the declaration.
    pub location: Location,
    /// Comment lines attached to the declaration, in source order.
    pub documentation: Vec<String>,
    /// Access level; defaults to public.
    pub visibility: Visibility,
}

impl Entry {
    /// Create a new public entry with no documentation.
    pub fn new(
        name: impl Into<String>,
        kind: EntryKind,
        origin_path: impl Into<PathBuf>,
        location: Location,
    ) -> Self {
        Entry {
            name: name.into(),
            kind,
            origin_path: origin_path.into(),
            location,
            documentation: Vec::new(),
            visibility: Visibility::Public,
        }
    }

    /// Attach documentation lines.
    pub fn with_documentation(mut self, lines: Vec<String>) -> Self {
        self.documentation = lines;
        self
    }

    /// Set the visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Whether this entry is a namespace (module or class).
    pub fn is_namespace(&self) -> bool {
        self.kind.is_namespace()
    }

    /// Last segment of the fully qualified name.
    ///
    /// Only namespaces expose a short name; constants return `None`.
    pub fn short_name(&self) -> Option<&str> {
        if !self.is_namespace() {
            return None;
        }
        Some(self.name.rsplit(SEPARATOR).next().unwrap_or(&self.name))
    }

    /// Whether this entry originated from the given file.
    pub fn originates_from(&self, path: &Path) -> bool {
        self.origin_path == path
    }
}

/// Strip the leading namespace-root marker (`::Foo::Bar` → `Foo::Bar`).
pub fn strip_root_marker(name: &str) -> &str {
    name.strip_prefix(SEPARATOR).unwrap_or(name)
}

// ============================================================================
// Tests
// ============================================================================
