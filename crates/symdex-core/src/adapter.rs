//! Parser adapter trait for pluggable declaration discovery.
//!
//! The engine does not parse source text. A [`DeclarationParser`] is supplied
//! by the integration layer (tree-walking visitor, language frontend, test
//! stub) and turns one file's content into [`Entry`] values. The index owns
//! all id allocation; parsers only produce data.
//!
//! # Contract
//!
//! - Entries must carry the `origin_path` they were parsed from, so
//!   file-granularity deletion attributes them correctly.
//! - Output order must follow source order; the index preserves insertion
//!   order within a name bucket.
//! - Parsers are called once per file and must not retain index state.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::entry::Entry;

// ============================================================================
// Parse Error
// ============================================================================

/// The parser could not produce declarations for a file.
#[derive(Debug, Error)]
#[error("parse error in {path}: {message}")]
pub struct ParseError {
    /// File whose content failed to parse.
    pub path: PathBuf,
    /// Parser-provided description of the failure.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Declaration Parser
// ============================================================================

/// Produces the declarations found in one file's source text.
pub trait DeclarationParser {
    /// Parse `source` (the content of `path`) into entries.
    fn parse(&self, path: &Path, source: &str) -> Result<Vec<Entry>, ParseError>;
}

// ============================================================================
// Tests
// ============================================================================
