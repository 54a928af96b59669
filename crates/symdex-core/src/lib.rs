//! Symbol index and type-relation engine for editor tooling backends.
//!
//! This crate provides the queryable core behind features like go-to-definition,
//! autocomplete, and type-hierarchy navigation:
//! - Entry model for discovered declarations (modules, classes, constants)
//! - Generic prefix tree for "all keys with this prefix" queries
//! - Index with exact, scoped-prefix, and fuzzy lookup plus incremental
//!   file-granularity updates and per-package cache orchestration
//! - Hierarchy poset maintaining a materialized transitive closure over a
//!   declared-type relation
//! - Parser adapter trait for pluggable declaration discovery
//!
//! Parsing source text, editor-protocol formatting, and file discovery are
//! external collaborators; this crate is an in-process data structure with a
//! narrow call/query interface.

pub mod adapter;
pub mod cache;
pub mod entry;
pub mod error;
pub mod hierarchy;
pub mod index;
pub mod indexable;
pub mod trie;
