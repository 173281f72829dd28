//! Adaptive edge container for radix nodes.
//!
//! Low-fanout nodes keep their edges in a small insertion-ordered list
//! (first two inline); once a node's fanout reaches [`FANOUT_SWITCH`] the
//! set is promoted to a map keyed by each label's first character, and
//! demoted back when it shrinks two below the threshold. Both forms
//! uphold the same invariant: no two edges of one node share a leading
//! character, so the candidate edge for any lookup is unique.

use std::collections::hash_map;
use std::collections::HashMap;
use std::mem;

use smallvec::SmallVec;

use super::NodeId;

/// Fanout at which a sparse edge list is promoted to a keyed map.
pub(super) const FANOUT_SWITCH: usize = 8;
/// Fanout at which a dense map is demoted back to a list.
const FANOUT_DEMOTE: usize = FANOUT_SWITCH - 2;

/// One outgoing edge: a non-empty label and the child it leads to.
#[derive(Debug)]
pub(super) struct Edge {
    pub label: String,
    pub child: NodeId,
}

impl Edge {
    #[inline]
    pub fn first(&self) -> char {
        self.label.chars().next().expect("edge labels are non-empty")
    }
}

/// The two representations of a node's outgoing edges.
#[derive(Debug)]
pub(super) enum EdgeSet {
    /// Insertion-ordered list, scanned by leading character.
    Sparse(SmallVec<[Edge; 2]>),
    /// Leading-character-keyed map for high-fanout nodes.
    Dense(HashMap<char, Edge>),
}

impl EdgeSet {
    pub fn with_edge(edge: Edge) -> Self {
        let mut edges = SmallVec::new();
        edges.push(edge);
        EdgeSet::Sparse(edges)
    }

    pub fn len(&self) -> usize {
        match self {
            EdgeSet::Sparse(edges) => edges.len(),
            EdgeSet::Dense(map) => map.len(),
        }
    }

    /// The edge whose label starts with `first`, if any.
    pub fn get(&self, first: char) -> Option<&Edge> {
        match self {
            EdgeSet::Sparse(edges) => edges.iter().find(|e| e.first() == first),
            EdgeSet::Dense(map) => map.get(&first),
        }
    }

    pub fn get_mut(&mut self, first: char) -> Option<&mut Edge> {
        match self {
            EdgeSet::Sparse(edges) => edges.iter_mut().find(|e| e.first() == first),
            EdgeSet::Dense(map) => map.get_mut(&first),
        }
    }

    /// Insert `edge`, replacing any edge with the same leading character.
    ///
    /// Promotion to the dense form happens when the set grows to
    /// [`FANOUT_SWITCH`]; the representation is a pure function of the
    /// current edge count.
    pub fn set(&mut self, edge: Edge) {
        match self {
            EdgeSet::Sparse(edges) => {
                let first = edge.first();
                if let Some(slot) = edges.iter_mut().find(|e| e.first() == first) {
                    *slot = edge;
                    return;
                }
                edges.push(edge);
                if edges.len() >= FANOUT_SWITCH {
                    let count = edges.len();
                    let map: HashMap<char, Edge> =
                        edges.drain(..).map(|e| (e.first(), e)).collect();
                    debug_assert_eq!(map.len(), count, "duplicate leading character");
                    *self = EdgeSet::Dense(map);
                }
            }
            EdgeSet::Dense(map) => {
                map.insert(edge.first(), edge);
            }
        }
    }

    /// Remove and return the edge with the given leading character.
    ///
    /// The caller collapses an emptied set back to `None` at the node
    /// level; demotion to the sparse form happens at [`FANOUT_DEMOTE`].
    pub fn remove(&mut self, first: char) -> Option<Edge> {
        match self {
            EdgeSet::Sparse(edges) => {
                let idx = edges.iter().position(|e| e.first() == first)?;
                Some(edges.remove(idx))
            }
            EdgeSet::Dense(map) => {
                let edge = map.remove(&first)?;
                if map.len() <= FANOUT_DEMOTE {
                    *self = EdgeSet::Sparse(map.drain().map(|(_, e)| e).collect());
                }
                Some(edge)
            }
        }
    }

    pub fn iter(&self) -> EdgeIter<'_> {
        match self {
            EdgeSet::Sparse(edges) => EdgeIter::Sparse(edges.iter()),
            EdgeSet::Dense(map) => EdgeIter::Dense(map.values()),
        }
    }

    /// Heap bytes held by labels and any spilled container storage.
    pub fn heap_bytes(&self) -> usize {
        let labels: usize = self.iter().map(|e| e.label.capacity()).sum();
        let container = match self {
            EdgeSet::Sparse(edges) => {
                if edges.spilled() {
                    edges.capacity() * mem::size_of::<Edge>()
                } else {
                    0
                }
            }
            EdgeSet::Dense(map) => map.capacity() * (mem::size_of::<char>() + mem::size_of::<Edge>()),
        };
        labels + container
    }

    #[cfg(test)]
    pub fn check_representation(&self) {
        match self {
            EdgeSet::Sparse(edges) => {
                assert!(!edges.is_empty(), "empty edge sets collapse to None");
                assert!(
                    edges.len() < FANOUT_SWITCH,
                    "sparse set at or above the switch threshold"
                );
            }
            EdgeSet::Dense(map) => {
                assert!(
                    map.len() > FANOUT_DEMOTE,
                    "dense set at or below the demotion threshold"
                );
                for (first, edge) in map {
                    assert_eq!(*first, edge.first(), "dense key drifted from its label");
                }
            }
        }
    }
}

/// Iterator over a node's edges in container order.
pub(super) enum EdgeIter<'a> {
    Sparse(std::slice::Iter<'a, Edge>),
    Dense(hash_map::Values<'a, char, Edge>),
    Empty,
}

impl<'a> Iterator for EdgeIter<'a> {
    type Item = &'a Edge;

    fn next(&mut self) -> Option<&'a Edge> {
        match self {
            EdgeIter::Sparse(iter) => iter.next(),
            EdgeIter::Dense(iter) => iter.next(),
            EdgeIter::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(label: &str, child: u32) -> Edge {
        Edge {
            label: label.to_owned(),
            child: NodeId(child),
        }
    }

    fn labels(set: &EdgeSet) -> Vec<String> {
        let mut out: Vec<String> = set.iter().map(|e| e.label.clone()).collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn set_replaces_by_leading_character() {
        let mut set = EdgeSet::with_edge(edge("abc", 1));
        set.set(edge("axe", 2));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get('a').map(|e| e.label.as_str()), Some("axe"));
        assert_eq!(set.get('a').map(|e| e.child), Some(NodeId(2)));
    }

    #[test]
    fn promotes_at_the_switch_threshold() {
        let mut set = EdgeSet::with_edge(edge("a", 0));
        for (i, l) in ["b", "c", "d", "e", "f", "g"].iter().enumerate() {
            set.set(edge(l, i as u32 + 1));
            assert!(matches!(set, EdgeSet::Sparse(_)));
        }
        set.set(edge("h", 7));
        assert!(matches!(set, EdgeSet::Dense(_)));
        assert_eq!(set.len(), FANOUT_SWITCH);
        assert_eq!(labels(&set), ["a", "b", "c", "d", "e", "f", "g", "h"]);
    }

    #[test]
    fn demotes_two_below_the_threshold() {
        let mut set = EdgeSet::with_edge(edge("a", 0));
        for (i, l) in ["b", "c", "d", "e", "f", "g", "h"].iter().enumerate() {
            set.set(edge(l, i as u32 + 1));
        }
        assert!(matches!(set, EdgeSet::Dense(_)));

        assert!(set.remove('h').is_some());
        assert!(matches!(set, EdgeSet::Dense(_)));
        assert!(set.remove('g').is_some());
        assert!(matches!(set, EdgeSet::Sparse(_)));
        assert_eq!(set.len(), 6);
        assert_eq!(labels(&set), ["a", "b", "c", "d", "e", "f"]);
        set.check_representation();
    }

    #[test]
    fn remove_misses_unknown_characters() {
        let mut set = EdgeSet::with_edge(edge("abc", 1));
        assert!(set.remove('z').is_none());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn lookup_is_by_first_character_only() {
        let mut set = EdgeSet::with_edge(edge("foo", 1));
        set.set(edge("bar", 2));
        assert_eq!(set.get('f').map(|e| e.child), Some(NodeId(1)));
        assert_eq!(set.get('b').map(|e| e.child), Some(NodeId(2)));
        assert!(set.get('o').is_none());
    }
}
