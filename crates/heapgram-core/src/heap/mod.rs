//! Heap configurations: hypergraphs describing one abstract heap.
//!
//! A configuration consists of typed nodes, labelled selector edges between
//! nodes, nonterminal hyperedges standing in for unbounded substructure,
//! variable edges naming nodes, and an ordered list of external nodes through
//! which the configuration can be substituted for a hyperedge elsewhere.
//!
//! Configurations are only mutated through a [`HeapBuilder`](crate::builder::HeapBuilder)
//! that owns them; readers share them immutably.

pub mod edge;
pub mod node;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use self::edge::{EdgeId, NonterminalEdge};
use self::node::{Node, NodeId, SelectorLabel};
use crate::builder::HeapBuilder;
use crate::session::TypeId;

/// Errors raised by structural operations on heap configurations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("nonterminal edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("variable not found: {0}")]
    VariableNotFound(String),

    #[error("selector {label} not found at node {node}")]
    SelectorNotFound { node: NodeId, label: SelectorLabel },

    #[error("node {node} already has an outgoing selector {label}")]
    DuplicateSelector { node: NodeId, label: SelectorLabel },

    #[error("duplicate variable: {0}")]
    DuplicateVariable(String),

    #[error("node {0} is already external")]
    DuplicateExternal(NodeId),

    #[error("rank mismatch for {label}: expected {expected} tentacles, found {found}")]
    RankMismatch {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("type mismatch at node {node}: expected {expected}, found {found}")]
    TypeMismatch {
        node: NodeId,
        expected: TypeId,
        found: TypeId,
    },

    #[error("matching does not map pattern node {0}")]
    UnmappedPatternNode(NodeId),

    #[error("matching does not map pattern edge {0}")]
    UnmappedPatternEdge(EdgeId),

    #[error("unknown type: {0}")]
    UnknownType(TypeId),

    #[error("type {ty} does not declare selector {selector}")]
    UndeclaredSelector { ty: String, selector: String },

    #[error("nonterminal {label} already interned with rank {rank}, requested rank {requested}")]
    NonterminalConflict {
        label: String,
        rank: usize,
        requested: usize,
    },

    #[error("invalid external partition: {reason}")]
    InvalidPartition { reason: String },

    #[error("matching maps {first} and {second} onto the same target element")]
    NonInjectiveMatching { first: String, second: String },
}

/// A hypergraph representing one abstract heap.
///
/// Node and edge ids are allocated from per-configuration counters and never
/// reused, so ids held by a caller stay meaningful across unrelated mutations.
#[derive(Debug, Clone, Default)]
pub struct HeapConfiguration {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) edges: BTreeMap<EdgeId, NonterminalEdge>,
    pub(crate) variables: BTreeMap<String, NodeId>,
    pub(crate) externals: Vec<NodeId>,
    /// Index: node -> nonterminal edges with a tentacle on it
    pub(crate) attached: BTreeMap<NodeId, BTreeSet<EdgeId>>,
    pub(crate) next_node: u32,
    pub(crate) next_edge: u32,
}

impl HeapConfiguration {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of this configuration for mutation.
    pub fn builder(self) -> HeapBuilder {
        HeapBuilder::from_heap(self)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of nonterminal hyperedges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn selector_count(&self) -> usize {
        self.nodes.values().map(|node| node.selectors.len()).sum()
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Total element count used as the size of a state.
    pub fn size(&self) -> usize {
        self.node_count() + self.edge_count() + self.selector_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn type_of(&self, id: NodeId) -> Option<TypeId> {
        self.nodes.get(&id).map(|node| node.ty)
    }

    pub fn selector_target(&self, node: NodeId, label: &SelectorLabel) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.selector(label))
    }

    /// Target of the selector with the given name at `node`, ignoring annotations.
    pub fn selector_named(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.selector_named(name))
    }

    /// All selector edges as `(source, label, target)`.
    pub fn selectors(&self) -> impl Iterator<Item = (NodeId, &SelectorLabel, NodeId)> + '_ {
        self.nodes.iter().flat_map(|(&from, node)| {
            node.selectors
                .iter()
                .map(move |(label, &to)| (from, label, to))
        })
    }

    /// Incoming selector edges of `node` as `(source, label)`.
    pub fn predecessors(&self, node: NodeId) -> Vec<(NodeId, &SelectorLabel)> {
        self.selectors()
            .filter(|&(_, _, to)| to == node)
            .map(|(from, label, _)| (from, label))
            .collect()
    }

    pub fn nonterminal_edges(&self) -> impl Iterator<Item = (EdgeId, &NonterminalEdge)> + '_ {
        self.edges.iter().map(|(&id, edge)| (id, edge))
    }

    pub fn nonterminal_edge(&self, id: EdgeId) -> Option<&NonterminalEdge> {
        self.edges.get(&id)
    }

    /// Nonterminal edges with at least one tentacle on `node`.
    pub fn attached_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.attached
            .get(&node)
            .into_iter()
            .flat_map(|edges| edges.iter().copied())
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.variables.iter().map(|(name, &node)| (name.as_str(), node))
    }

    pub fn variable_target(&self, name: &str) -> Option<NodeId> {
        self.variables.get(name).copied()
    }

    /// Names of variables pointing at `node`.
    pub fn variables_at(&self, node: NodeId) -> impl Iterator<Item = &str> + '_ {
        self.variables
            .iter()
            .filter(move |(_, &target)| target == node)
            .map(|(name, _)| name.as_str())
    }

    pub fn externals(&self) -> &[NodeId] {
        &self.externals
    }

    pub fn is_external(&self, node: NodeId) -> bool {
        self.externals.contains(&node)
    }

    /// Position of `node` in the external ordering.
    pub fn external_index(&self, node: NodeId) -> Option<usize> {
        self.externals.iter().position(|&n| n == node)
    }

    /// Check all structural invariants.
    pub fn validate(&self) -> Result<(), GraphError> {
        for (from, label, to) in self.selectors() {
            if !self.contains_node(to) {
                return Err(GraphError::SelectorNotFound {
                    node: from,
                    label: label.clone(),
                });
            }
        }
        for (id, edge) in self.nonterminal_edges() {
            if edge.label.rank() != edge.rank() {
                return Err(GraphError::RankMismatch {
                    label: edge.label.to_string(),
                    expected: edge.label.rank(),
                    found: edge.rank(),
                });
            }
            for &node in &edge.tentacles {
                if !self.contains_node(node) {
                    return Err(GraphError::NodeNotFound(node));
                }
                if !self.attached.get(&node).is_some_and(|set| set.contains(&id)) {
                    return Err(GraphError::EdgeNotFound(id));
                }
            }
        }
        for (_, node) in self.variables() {
            if !self.contains_node(node) {
                return Err(GraphError::NodeNotFound(node));
            }
        }
        let mut seen = BTreeSet::new();
        for &node in &self.externals {
            if !self.contains_node(node) {
                return Err(GraphError::NodeNotFound(node));
            }
            if !seen.insert(node) {
                return Err(GraphError::DuplicateExternal(node));
            }
        }
        Ok(())
    }

    pub(crate) fn fresh_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub(crate) fn fresh_edge_id(&mut self) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        id
    }
}

impl fmt::Display for HeapConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        let mut sep = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            if !first {
                write!(f, "; ")?;
            }
            first = false;
            Ok(())
        };
        for (from, label, to) in self.selectors() {
            sep(f)?;
            write!(f, "{from} -{label}-> {to}")?;
        }
        for (_, edge) in self.nonterminal_edges() {
            sep(f)?;
            write!(f, "{edge}")?;
        }
        for (name, node) in self.variables() {
            sep(f)?;
            write!(f, "{name} = {node}")?;
        }
        if !self.externals.is_empty() {
            sep(f)?;
            let ext: Vec<String> = self.externals.iter().map(|n| n.to_string()).collect();
            write!(f, "ext [{}]", ext.join(", "))?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    fn two_node_list(session: &mut Session) -> HeapConfiguration {
        let ty = session.declare_type("List", ["next"]);
        let mut builder = HeapBuilder::new();
        let nodes = builder.add_nodes(ty, 2);
        builder.add_selector(nodes[0], "next", nodes[1]).unwrap();
        builder.add_variable("x", nodes[0]).unwrap();
        builder.set_external(nodes[1]).unwrap();
        builder.build()
    }

    #[test]
    fn empty_configuration() {
        let heap = HeapConfiguration::new();
        assert_eq!(heap.node_count(), 0);
        assert_eq!(heap.edge_count(), 0);
        assert_eq!(heap.size(), 0);
        assert!(heap.validate().is_ok());
    }

    #[test]
    fn read_accessors() {
        let mut session = Session::new();
        let heap = two_node_list(&mut session);
        let x = heap.variable_target("x").unwrap();
        let succ = heap.selector_named(x, "next").unwrap();
        assert_eq!(heap.selector_count(), 1);
        assert_eq!(heap.predecessors(succ).len(), 1);
        assert_eq!(heap.variables_at(x).collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(heap.external_index(succ), Some(0));
        assert!(!heap.is_external(x));
        assert!(heap.validate().is_ok());
    }

    #[test]
    fn clones_are_independent() {
        let mut session = Session::new();
        let heap = two_node_list(&mut session);
        let x = heap.variable_target("x").unwrap();
        let mut builder = heap.clone().builder();
        builder.remove_selector(x, &"next".into()).unwrap();
        let changed = builder.build();
        assert_eq!(heap.selector_count(), 1);
        assert_eq!(changed.selector_count(), 0);
        assert_eq!(heap.externals(), changed.externals());
    }

    #[test]
    fn display_lists_elements() {
        let mut session = Session::new();
        let heap = two_node_list(&mut session);
        let text = heap.to_string();
        assert!(text.contains("-next->"));
        assert!(text.contains("x = "));
        assert!(text.contains("ext ["));
    }
}
