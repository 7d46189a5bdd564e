//! Matchings: structure-preserving maps from a pattern into a target.

use std::collections::BTreeMap;

use crate::heap::edge::EdgeId;
use crate::heap::node::NodeId;
use crate::heap::HeapConfiguration;

/// An injective map from the nodes of a pattern configuration to the nodes of
/// a target configuration, together with the induced correspondence of
/// nonterminal edges. Variable edges correspond by name.
///
/// The matching borrows the pattern (usually a grammar rule) but not the
/// target, so the target can be rebuilt from the matching once the search is
/// over.
#[derive(Debug, Clone)]
pub struct Matching<'p> {
    pattern: &'p HeapConfiguration,
    nodes: BTreeMap<NodeId, NodeId>,
    edges: BTreeMap<EdgeId, EdgeId>,
}

impl<'p> Matching<'p> {
    pub fn new(
        pattern: &'p HeapConfiguration,
        nodes: BTreeMap<NodeId, NodeId>,
        edges: BTreeMap<EdgeId, EdgeId>,
    ) -> Self {
        Self {
            pattern,
            nodes,
            edges,
        }
    }

    pub fn pattern(&self) -> &'p HeapConfiguration {
        self.pattern
    }

    /// Image of a pattern node.
    pub fn match_node(&self, pattern_node: NodeId) -> Option<NodeId> {
        self.nodes.get(&pattern_node).copied()
    }

    /// Image of a pattern nonterminal edge.
    pub fn match_edge(&self, pattern_edge: EdgeId) -> Option<EdgeId> {
        self.edges.get(&pattern_edge).copied()
    }

    pub fn node_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.iter().map(|(&p, &t)| (p, t))
    }

    pub fn edge_pairs(&self) -> impl Iterator<Item = (EdgeId, EdgeId)> + '_ {
        self.edges.iter().map(|(&p, &t)| (p, t))
    }

    /// Images of the pattern's external nodes, in external order.
    pub fn external_images(&self) -> Vec<NodeId> {
        self.pattern
            .externals()
            .iter()
            .filter_map(|n| self.match_node(*n))
            .collect()
    }
}
