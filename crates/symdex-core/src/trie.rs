//! Generic prefix tree (trie) keyed by strings.
//!
//! Optimized for "all payloads whose key shares this prefix" queries, which
//! back both name autocomplete and require-path completion. Children are kept
//! in a `BTreeMap` so traversal order — and therefore [`PrefixTree::search`]
//! output — is deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Node
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node<V> {
    children: BTreeMap<char, Node<V>>,
    value: Option<V>,
}

impl<V> Default for Node<V> {
    fn default() -> Self {
        Node {
            children: BTreeMap::new(),
            value: None,
        }
    }
}

impl<V> Node<V> {
    /// Collect payloads of this node and all descendants, depth-first in
    /// child order.
    fn collect<'a>(&'a self, out: &mut Vec<&'a V>) {
        if let Some(value) = &self.value {
            out.push(value);
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }

    /// Remove the value at `key`, pruning branches left without values.
    ///
    /// Returns the removed value and whether this node itself became
    /// prunable (no value, no children).
    fn remove(&mut self, mut key: std::str::Chars<'_>) -> (Option<V>, bool) {
        match key.next() {
            None => {
                let value = self.value.take();
                (value, self.children.is_empty())
            }
            Some(c) => {
                let Some(child) = self.children.get_mut(&c) else {
                    return (None, false);
                };
                let (value, prune_child) = child.remove(key);
                if prune_child {
                    self.children.remove(&c);
                }
                (value, self.value.is_none() && self.children.is_empty())
            }
        }
    }
}

// ============================================================================
// Prefix Tree
// ============================================================================

/// String-keyed associative store supporting prefix queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixTree<V> {
    root: Node<V>,
    len: usize,
}

impl<V> Default for PrefixTree<V> {
    fn default() -> Self {
        PrefixTree::new()
    }
}

impl<V> PrefixTree<V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        PrefixTree {
            root: Node::default(),
            len: 0,
        }
    }

    /// Number of keys with a payload.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Set the payload at `key`, replacing any previous payload in full.
    ///
    /// Returns the replaced payload, if any.
    pub fn insert(&mut self, key: &str, value: V) -> Option<V> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_default();
        }
        let previous = node.value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Get the payload at the exact key.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.node_at(key).and_then(|node| node.value.as_ref())
    }

    /// Remove the payload at the exact key (descendant keys are untouched).
    ///
    /// Branches left without payloads are pruned. Returns the removed
    /// payload, if any.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        let (value, _) = self.root.remove(key.chars());
        if value.is_some() {
            self.len -= 1;
        }
        value
    }

    /// Payloads of every key having `prefix` as a prefix, including the
    /// prefix itself if present, in deterministic depth-first order.
    pub fn search(&self, prefix: &str) -> Vec<&V> {
        let mut results = Vec::new();
        if let Some(node) = self.node_at(prefix) {
            node.collect(&mut results);
        }
        results
    }

    /// Insert every key of `other` into `self`, replacing on key collision.
    ///
    /// Shallow replace semantics: colliding payloads are not combined, the
    /// incoming payload wins.
    pub fn merge(&mut self, other: PrefixTree<V>) {
        let mut stack = vec![(String::new(), other.root)];
        while let Some((key, node)) = stack.pop() {
            if let Some(value) = node.value {
                self.insert(&key, value);
            }
            for (c, child) in node.children {
                let mut child_key = key.clone();
                child_key.push(c);
                stack.push((child_key, child));
            }
        }
    }

    fn node_at(&self, key: &str) -> Option<&Node<V>> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.children.get(&c)?;
        }
        Some(node)
    }
}

// ============================================================================
// Tests
// ============================================================================
