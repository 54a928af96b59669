//! Hierarchy: a poset over declared-type relations with an incrementally
//! maintained transitive closure.
//!
//! Elements are opaque names (e.g. type names), interned to [`ElementId`]s.
//! Each element owns four edge sets: direct and transitive predecessors, and
//! direct and transitive successors. The transitive sets are reflexive and
//! always fully materialized — [`Hierarchy::add_relation`] extends the
//! closure for every path flowing through the new edge, so queries never
//! rescan the graph.
//!
//! For an "is-subtype-of" relation with edges pointing from subtype to
//! supertype, `transitive_to` answers "all supertypes of X" and
//! `transitive_from` answers "all subtypes of X".
//!
//! The structure is append-only: elements and relations are never removed.
//! Memory for the materialized closure is O(V²) in the worst case on dense
//! relations; consumers that cannot afford that can BFS over the direct edge
//! sets instead, which stay exposed alongside the transitive ones.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ============================================================================
// Element ID
// ============================================================================

/// Interned identifier for a hierarchy element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "elem_{}", self.0)
    }
}

// ============================================================================
// Element Node
// ============================================================================

/// Edge sets of one element. Transitive sets include the element itself.
#[derive(Debug, Clone, Default)]
struct ElementNode {
    direct_from: BTreeSet<ElementId>,
    transitive_from: BTreeSet<ElementId>,
    direct_to: BTreeSet<ElementId>,
    transitive_to: BTreeSet<ElementId>,
}

// ============================================================================
// Hierarchy
// ============================================================================

/// Set of named elements with ancestor/descendant queries over a directed
/// relation, maintained incrementally as edges are added.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    /// ElementId → name (ids are dense indices into this list).
    names: Vec<String>,
    /// name → ElementId.
    ids: HashMap<String, ElementId>,
    /// ElementId → edge sets, parallel to `names`.
    nodes: Vec<ElementNode>,
}

impl Hierarchy {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Hierarchy::default()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the hierarchy has no elements.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether an element with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    /// Ensure an element exists, creating it with reflexive transitive sets
    /// if this is its first mention. Idempotent.
    pub fn add_element(&mut self, name: &str) -> ElementId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = ElementId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        let mut node = ElementNode::default();
        node.transitive_from.insert(id);
        node.transitive_to.insert(id);
        self.nodes.push(node);
        id
    }

    /// Record the direct edge `from → to` and extend the transitive closure.
    ///
    /// Both endpoints are created on first mention. Every transitive
    /// predecessor of `from` gains every transitive successor of `to` as a
    /// successor, and symmetrically, which covers all paths that now flow
    /// through the new edge. Cost per call is
    /// O(|transitive_from(from)| · |transitive_to(to)|). Idempotent.
    pub fn add_relation(&mut self, from: &str, to: &str) {
        let from = self.add_element(from);
        let to = self.add_element(to);

        self.nodes[from.index()].direct_to.insert(to);
        self.nodes[to.index()].direct_from.insert(from);

        let predecessors: Vec<ElementId> =
            self.nodes[from.index()].transitive_from.iter().copied().collect();
        let successors: Vec<ElementId> =
            self.nodes[to.index()].transitive_to.iter().copied().collect();
        for &p in &predecessors {
            for &s in &successors {
                self.nodes[p.index()].transitive_to.insert(s);
                self.nodes[s.index()].transitive_from.insert(p);
            }
        }
    }

    /// Read access to an element's edge sets.
    pub fn get(&self, name: &str) -> Option<ElementView<'_>> {
        let id = *self.ids.get(name)?;
        Some(ElementView {
            hierarchy: self,
            id,
        })
    }

    fn resolve(&self, ids: &BTreeSet<ElementId>) -> Vec<&str> {
        ids.iter().map(|id| self.names[id.index()].as_str()).collect()
    }
}

// ============================================================================
// Element View
// ============================================================================

/// Read-only view of one element's four edge sets, resolved to names.
///
/// Names within each set come back in interning order (first mention first).
#[derive(Clone, Copy)]
pub struct ElementView<'a> {
    hierarchy: &'a Hierarchy,
    id: ElementId,
}

impl<'a> ElementView<'a> {
    /// The element's name.
    pub fn name(&self) -> &'a str {
        &self.hierarchy.names[self.id.index()]
    }

    /// The element's interned id.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Immediate predecessors (elements with a direct edge into this one).
    pub fn direct_from(&self) -> Vec<&'a str> {
        self.hierarchy.resolve(&self.node().direct_from)
    }

    /// Immediate successors (elements this one has a direct edge to).
    pub fn direct_to(&self) -> Vec<&'a str> {
        self.hierarchy.resolve(&self.node().direct_to)
    }

    /// All transitive predecessors, including the element itself.
    pub fn transitive_from(&self) -> Vec<&'a str> {
        self.hierarchy.resolve(&self.node().transitive_from)
    }

    /// All transitive successors, including the element itself.
    pub fn transitive_to(&self) -> Vec<&'a str> {
        self.hierarchy.resolve(&self.node().transitive_to)
    }

    /// Transitive successors excluding the element itself. For a
    /// subtype-to-supertype relation these are the element's supertypes.
    pub fn ancestors(&self) -> Vec<&'a str> {
        let name = self.name();
        self.transitive_to().into_iter().filter(|&n| n != name).collect()
    }

    /// Transitive predecessors excluding the element itself. For a
    /// subtype-to-supertype relation these are the element's subtypes.
    pub fn descendants(&self) -> Vec<&'a str> {
        let name = self.name();
        self.transitive_from().into_iter().filter(|&n| n != name).collect()
    }

    fn node(&self) -> &'a ElementNode {
        &self.hierarchy.nodes[self.id.index()]
    }
}

impl fmt::Debug for ElementView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementView")
            .field("name", &self.name())
            .field("direct_from", &self.direct_from())
            .field("direct_to", &self.direct_to())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
