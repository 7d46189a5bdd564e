//! Mutation API for heap configurations.
//!
//! A [`HeapBuilder`] owns the configuration it edits, so mutating a shared
//! configuration always starts from a clone: `heap.clone().builder()`. Every
//! operation validates its arguments before touching the configuration; on
//! error the configuration is left exactly as it was.
//!
//! # Example
//!
//! ```rust
//! use heapgram_core::builder::HeapBuilder;
//! use heapgram_core::session::Session;
//!
//! let mut session = Session::new();
//! let list = session.declare_type("List", ["next"]);
//! let sll = session.nonterminal("SLL", &[false, true]).unwrap();
//!
//! let mut builder = HeapBuilder::new();
//! let nodes = builder.add_nodes(list, 3);
//! builder.add_selector(nodes[0], "next", nodes[1]).unwrap();
//! builder.add_nonterminal_edge(sll, vec![nodes[1], nodes[2]]).unwrap();
//! builder.add_variable("head", nodes[0]).unwrap();
//!
//! let heap = builder.build();
//! assert_eq!(heap.node_count(), 3);
//! assert_eq!(heap.edge_count(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::heap::edge::{EdgeId, NonterminalEdge};
use crate::heap::node::{Node, NodeId, SelectorLabel};
use crate::heap::{GraphError, HeapConfiguration};
use crate::matching::Matching;
use crate::nonterminal::Nonterminal;
use crate::session::TypeId;

/// Fresh elements created by splicing a right-hand side into a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Splice {
    /// Copies of the right-hand side's internal nodes.
    pub nodes: Vec<NodeId>,
    /// Copies of the right-hand side's nonterminal edges.
    pub edges: Vec<EdgeId>,
}

/// Owner of a heap configuration under construction or modification.
#[derive(Debug, Clone, Default)]
pub struct HeapBuilder {
    heap: HeapConfiguration,
}

impl HeapBuilder {
    /// Start from an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn from_heap(heap: HeapConfiguration) -> Self {
        Self { heap }
    }

    /// Read access to the configuration being built.
    pub fn heap(&self) -> &HeapConfiguration {
        &self.heap
    }

    /// Finish building.
    pub fn build(self) -> HeapConfiguration {
        self.heap
    }

    // === Nodes ===

    pub fn add_node(&mut self, ty: TypeId) -> NodeId {
        let id = self.heap.fresh_node_id();
        self.heap.nodes.insert(id, Node::new(ty));
        id
    }

    /// Add `count` nodes of the same type, returning their ids in creation order.
    pub fn add_nodes(&mut self, ty: TypeId, count: usize) -> Vec<NodeId> {
        (0..count).map(|_| self.add_node(ty)).collect()
    }

    /// Remove a node together with every selector, nonterminal edge, variable
    /// and external entry that references it.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), GraphError> {
        if !self.heap.contains_node(node) {
            return Err(GraphError::NodeNotFound(node));
        }
        let attached: Vec<EdgeId> = self.heap.attached_edges(node).collect();
        for edge in attached {
            self.detach_edge(edge);
        }
        for other in self.heap.nodes.values_mut() {
            other.selectors.retain(|_, target| *target != node);
        }
        self.heap.variables.retain(|_, target| *target != node);
        self.heap.externals.retain(|&ext| ext != node);
        self.heap.attached.remove(&node);
        self.heap.nodes.remove(&node);
        Ok(())
    }

    /// Append a node to the external ordering.
    pub fn set_external(&mut self, node: NodeId) -> Result<(), GraphError> {
        if !self.heap.contains_node(node) {
            return Err(GraphError::NodeNotFound(node));
        }
        if self.heap.is_external(node) {
            return Err(GraphError::DuplicateExternal(node));
        }
        self.heap.externals.push(node);
        Ok(())
    }

    // === Selector edges ===

    pub fn add_selector(
        &mut self,
        from: NodeId,
        label: impl Into<SelectorLabel>,
        to: NodeId,
    ) -> Result<(), GraphError> {
        let label = label.into();
        if !self.heap.contains_node(to) {
            return Err(GraphError::NodeNotFound(to));
        }
        let source = self
            .heap
            .nodes
            .get_mut(&from)
            .ok_or(GraphError::NodeNotFound(from))?;
        if source.selectors.contains_key(&label) {
            return Err(GraphError::DuplicateSelector { node: from, label });
        }
        source.selectors.insert(label, to);
        Ok(())
    }

    /// Remove a selector edge, returning its former target.
    pub fn remove_selector(
        &mut self,
        from: NodeId,
        label: &SelectorLabel,
    ) -> Result<NodeId, GraphError> {
        let source = self
            .heap
            .nodes
            .get_mut(&from)
            .ok_or(GraphError::NodeNotFound(from))?;
        source
            .selectors
            .remove(label)
            .ok_or_else(|| GraphError::SelectorNotFound {
                node: from,
                label: label.clone(),
            })
    }

    // === Nonterminal edges ===

    pub fn add_nonterminal_edge(
        &mut self,
        label: Nonterminal,
        tentacles: Vec<NodeId>,
    ) -> Result<EdgeId, GraphError> {
        if label.rank() != tentacles.len() {
            return Err(GraphError::RankMismatch {
                label: label.to_string(),
                expected: label.rank(),
                found: tentacles.len(),
            });
        }
        if let Some(&missing) = tentacles.iter().find(|&&n| !self.heap.contains_node(n)) {
            return Err(GraphError::NodeNotFound(missing));
        }
        Ok(self.attach_edge(NonterminalEdge::new(label, tentacles)))
    }

    pub fn remove_nonterminal_edge(&mut self, edge: EdgeId) -> Result<NonterminalEdge, GraphError> {
        if !self.heap.edges.contains_key(&edge) {
            return Err(GraphError::EdgeNotFound(edge));
        }
        self.detach_edge(edge).ok_or(GraphError::EdgeNotFound(edge))
    }

    // === Variable edges ===

    pub fn add_variable(&mut self, name: &str, node: NodeId) -> Result<(), GraphError> {
        if !self.heap.contains_node(node) {
            return Err(GraphError::NodeNotFound(node));
        }
        if self.heap.variables.contains_key(name) {
            return Err(GraphError::DuplicateVariable(name.to_string()));
        }
        self.heap.variables.insert(name.to_string(), node);
        Ok(())
    }

    /// Remove a variable edge, returning the node it referenced.
    pub fn remove_variable(&mut self, name: &str) -> Result<NodeId, GraphError> {
        self.heap
            .variables
            .remove(name)
            .ok_or_else(|| GraphError::VariableNotFound(name.to_string()))
    }

    /// Point `name` at `node`, replacing any previous binding.
    pub fn rebind_variable(&mut self, name: &str, node: NodeId) -> Result<(), GraphError> {
        if !self.heap.contains_node(node) {
            return Err(GraphError::NodeNotFound(node));
        }
        self.heap.variables.insert(name.to_string(), node);
        Ok(())
    }

    // === Grammar-driven replacement ===

    /// Fold the image of a matched right-hand side into one nonterminal edge.
    ///
    /// Tentacle `i` of the new edge is the image of the pattern's `i`-th
    /// external node.
    pub fn replace_matching(
        &mut self,
        matching: &Matching<'_>,
        label: Nonterminal,
    ) -> Result<EdgeId, GraphError> {
        let identity: Vec<usize> = (0..matching.pattern().externals().len()).collect();
        self.replace_matching_collapsed(matching, label, &identity)
    }

    /// Like [`replace_matching`](Self::replace_matching) for a pattern whose
    /// externals were merged: tentacle `i` of the new edge is the image of
    /// pattern external `external_map[i]`.
    pub fn replace_matching_collapsed(
        &mut self,
        matching: &Matching<'_>,
        label: Nonterminal,
        external_map: &[usize],
    ) -> Result<EdgeId, GraphError> {
        let pattern = matching.pattern();
        if label.rank() != external_map.len() {
            return Err(GraphError::RankMismatch {
                label: label.to_string(),
                expected: label.rank(),
                found: external_map.len(),
            });
        }

        let mut image = BTreeMap::new();
        let mut preimage = BTreeMap::new();
        for p in pattern.nodes() {
            let t = matching
                .match_node(p)
                .ok_or(GraphError::UnmappedPatternNode(p))?;
            if !self.heap.contains_node(t) {
                return Err(GraphError::NodeNotFound(t));
            }
            if let Some(other) = preimage.insert(t, p) {
                return Err(GraphError::NonInjectiveMatching {
                    first: other.to_string(),
                    second: p.to_string(),
                });
            }
            image.insert(p, t);
        }

        let mut tentacles = Vec::with_capacity(external_map.len());
        for &position in external_map {
            let external = pattern.externals().get(position).copied().ok_or_else(|| {
                GraphError::InvalidPartition {
                    reason: format!("external position {position} out of range"),
                }
            })?;
            tentacles.push(image[&external]);
        }

        let mut doomed_edges = BTreeMap::new();
        for (p, _) in pattern.nonterminal_edges() {
            let t = matching
                .match_edge(p)
                .ok_or(GraphError::UnmappedPatternEdge(p))?;
            if !self.heap.edges.contains_key(&t) {
                return Err(GraphError::EdgeNotFound(t));
            }
            if let Some(other) = doomed_edges.insert(t, p) {
                return Err(GraphError::NonInjectiveMatching {
                    first: other.to_string(),
                    second: p.to_string(),
                });
            }
        }

        let mut doomed_selectors = Vec::new();
        for (from, label, to) in pattern.selectors() {
            let source = image[&from];
            if self.heap.selector_target(source, label) != Some(image[&to]) {
                return Err(GraphError::SelectorNotFound {
                    node: source,
                    label: label.clone(),
                });
            }
            doomed_selectors.push((source, label.clone()));
        }

        let doomed_nodes: Vec<NodeId> = pattern
            .nodes()
            .filter(|&p| !pattern.is_external(p))
            .map(|p| image[&p])
            .collect();

        // images are distinct, so every removal below succeeds
        for (source, label) in doomed_selectors {
            self.remove_selector(source, &label)?;
        }
        for edge in doomed_edges.into_keys() {
            self.detach_edge(edge);
        }
        for node in doomed_nodes {
            self.remove_node(node)?;
        }
        trace!("folded matching into {label} over {tentacles:?}");
        Ok(self.attach_edge(NonterminalEdge::new(label, tentacles)))
    }

    /// Unfold one nonterminal edge by splicing in a fresh copy of `rhs`.
    ///
    /// External node `i` of `rhs` is identified with tentacle `i` of the edge;
    /// internal nodes and nonterminal edges of `rhs` receive fresh ids, which
    /// are returned.
    pub fn replace_nonterminal_edge(
        &mut self,
        edge: EdgeId,
        rhs: &HeapConfiguration,
    ) -> Result<Splice, GraphError> {
        let replaced = self
            .heap
            .nonterminal_edge(edge)
            .ok_or(GraphError::EdgeNotFound(edge))?;
        if rhs.externals().len() != replaced.rank() {
            return Err(GraphError::RankMismatch {
                label: replaced.label.to_string(),
                expected: replaced.rank(),
                found: rhs.externals().len(),
            });
        }

        // Plan the node mapping without allocating ids yet.
        let mut mapping = BTreeMap::new();
        for (position, &external) in rhs.externals().iter().enumerate() {
            let tentacle = replaced.tentacles[position];
            let expected = rhs.type_of(external).ok_or(GraphError::NodeNotFound(external))?;
            let found = self
                .heap
                .type_of(tentacle)
                .ok_or(GraphError::NodeNotFound(tentacle))?;
            if expected != found {
                return Err(GraphError::TypeMismatch {
                    node: tentacle,
                    expected,
                    found,
                });
            }
            mapping.insert(external, tentacle);
        }
        let mut next = self.heap.next_node;
        let mut internal = Vec::new();
        for node in rhs.nodes().filter(|&n| !rhs.is_external(n)) {
            let fresh = NodeId(next);
            next += 1;
            mapping.insert(node, fresh);
            internal.push((node, fresh));
        }

        let mut planned = BTreeSet::new();
        for (from, label, _) in rhs.selectors() {
            let source = mapping[&from];
            let exists = self
                .heap
                .node(source)
                .is_some_and(|n| n.selector(label).is_some());
            if exists || !planned.insert((source, label.clone())) {
                return Err(GraphError::DuplicateSelector {
                    node: source,
                    label: label.clone(),
                });
            }
        }
        for (name, _) in rhs.variables() {
            if self.heap.variables.contains_key(name) {
                return Err(GraphError::DuplicateVariable(name.to_string()));
            }
        }

        self.detach_edge(edge);
        let mut splice = Splice::default();
        for (original, fresh) in internal {
            let ty = rhs.type_of(original).ok_or(GraphError::NodeNotFound(original))?;
            self.heap.nodes.insert(fresh, Node::new(ty));
            splice.nodes.push(fresh);
        }
        self.heap.next_node = next;
        for (from, label, to) in rhs.selectors() {
            self.add_selector(mapping[&from], label.clone(), mapping[&to])?;
        }
        for (_, rhs_edge) in rhs.nonterminal_edges() {
            let tentacles = rhs_edge.tentacles.iter().map(|n| mapping[n]).collect();
            let id = self.attach_edge(NonterminalEdge::new(rhs_edge.label.clone(), tentacles));
            splice.edges.push(id);
        }
        for (name, node) in rhs.variables() {
            self.add_variable(name, mapping[&node])?;
        }
        trace!(
            "unfolded {edge}: {} fresh nodes, {} fresh edges",
            splice.nodes.len(),
            splice.edges.len()
        );
        Ok(splice)
    }

    /// Merge external nodes according to `partition`.
    ///
    /// `partition[i]` names the external position that external `i` is merged
    /// into; it must not exceed `i` and must itself be a representative.
    /// Returns, for every original external position, its position in the
    /// shortened external ordering.
    pub fn merge_externals(&mut self, partition: &[usize]) -> Result<Vec<usize>, GraphError> {
        let externals = self.heap.externals.clone();
        if partition.len() != externals.len() {
            return Err(GraphError::InvalidPartition {
                reason: format!(
                    "{} entries for {} external nodes",
                    partition.len(),
                    externals.len()
                ),
            });
        }
        for (i, &rep) in partition.iter().enumerate() {
            if rep > i || partition[rep] != rep {
                return Err(GraphError::InvalidPartition {
                    reason: format!("position {i} maps to non-representative {rep}"),
                });
            }
            let (node, target) = (externals[i], externals[rep]);
            let (found, expected) = (self.type_of(node)?, self.type_of(target)?);
            if found != expected {
                return Err(GraphError::TypeMismatch {
                    node,
                    expected,
                    found,
                });
            }
        }

        // Outgoing selectors of each block must stay unique once merged.
        let mut outgoing: BTreeMap<NodeId, BTreeSet<SelectorLabel>> = BTreeMap::new();
        for (i, &rep) in partition.iter().enumerate() {
            let target = externals[rep];
            let labels = outgoing.entry(target).or_default();
            if let Some(node) = self.heap.node(externals[i]) {
                for (label, _) in node.selectors() {
                    if !labels.insert(label.clone()) {
                        return Err(GraphError::DuplicateSelector {
                            node: target,
                            label: label.clone(),
                        });
                    }
                }
            }
        }

        let redirect: BTreeMap<NodeId, NodeId> = partition
            .iter()
            .enumerate()
            .filter(|&(i, &rep)| i != rep)
            .map(|(i, &rep)| (externals[i], externals[rep]))
            .collect();
        let resolve = |node: NodeId| redirect.get(&node).copied().unwrap_or(node);

        for (&merged, &target) in &redirect {
            if let Some(node) = self.heap.nodes.remove(&merged) {
                let entry = self
                    .heap
                    .nodes
                    .get_mut(&target)
                    .ok_or(GraphError::NodeNotFound(target))?;
                entry.selectors.extend(node.selectors);
            }
        }
        for node in self.heap.nodes.values_mut() {
            for target in node.selectors.values_mut() {
                *target = resolve(*target);
            }
        }
        for &merged in redirect.keys() {
            if let Some(edges) = self.heap.attached.remove(&merged) {
                for id in edges {
                    if let Some(edge) = self.heap.edges.get_mut(&id) {
                        for tentacle in edge.tentacles.iter_mut() {
                            *tentacle = resolve(*tentacle);
                        }
                        let target = resolve(merged);
                        self.heap.attached.entry(target).or_default().insert(id);
                    }
                }
            }
        }
        for target in self.heap.variables.values_mut() {
            *target = resolve(*target);
        }

        let mut positions = vec![0; partition.len()];
        let mut kept = Vec::new();
        for (i, &rep) in partition.iter().enumerate() {
            if i == rep {
                positions[i] = kept.len();
                kept.push(externals[i]);
            } else {
                positions[i] = positions[rep];
            }
        }
        self.heap.externals = kept;
        Ok(positions)
    }

    fn type_of(&self, node: NodeId) -> Result<TypeId, GraphError> {
        self.heap.type_of(node).ok_or(GraphError::NodeNotFound(node))
    }

    fn attach_edge(&mut self, edge: NonterminalEdge) -> EdgeId {
        let id = self.heap.fresh_edge_id();
        for &node in &edge.tentacles {
            self.heap.attached.entry(node).or_default().insert(id);
        }
        self.heap.edges.insert(id, edge);
        id
    }

    fn detach_edge(&mut self, id: EdgeId) -> Option<NonterminalEdge> {
        let edge = self.heap.edges.remove(&id)?;
        for node in &edge.tentacles {
            if let Some(set) = self.heap.attached.get_mut(node) {
                set.remove(&id);
            }
        }
        Some(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    struct Fixture {
        session: Session,
        list: TypeId,
        sll: Nonterminal,
    }

    fn fixture() -> Fixture {
        let mut session = Session::new();
        let list = session.declare_type("List", ["next"]);
        let sll = session.nonterminal("SLL", &[false, true]).unwrap();
        Fixture {
            session,
            list,
            sll,
        }
    }

    /// `x -next-> z`, `SLL(z, y)` with externals `[x, y]`.
    fn step_rule(fx: &Fixture) -> HeapConfiguration {
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[0], "next", n[2]).unwrap();
        builder
            .add_nonterminal_edge(fx.sll.clone(), vec![n[2], n[1]])
            .unwrap();
        builder.set_external(n[0]).unwrap();
        builder.set_external(n[1]).unwrap();
        builder.build()
    }

    #[test]
    fn add_selector_rejects_duplicates_and_dangling() {
        let fx = fixture();
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 2);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        assert!(matches!(
            builder.add_selector(n[0], "next", n[0]),
            Err(GraphError::DuplicateSelector { .. })
        ));
        assert!(matches!(
            builder.add_selector(n[0], "other", NodeId(99)),
            Err(GraphError::NodeNotFound(_))
        ));
        assert_eq!(builder.heap().selector_count(), 1);
    }

    #[test]
    fn nonterminal_rank_checked() {
        let fx = fixture();
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        let err = builder
            .add_nonterminal_edge(fx.sll.clone(), n.clone())
            .unwrap_err();
        assert!(matches!(err, GraphError::RankMismatch { expected: 2, found: 3, .. }));
        assert_eq!(builder.heap().edge_count(), 0);
    }

    #[test]
    fn remove_node_drops_incident_elements() {
        let fx = fixture();
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        builder
            .add_nonterminal_edge(fx.sll.clone(), vec![n[1], n[2]])
            .unwrap();
        builder.add_variable("y", n[1]).unwrap();
        builder.set_external(n[1]).unwrap();
        builder.remove_node(n[1]).unwrap();
        let heap = builder.build();
        assert_eq!(heap.node_count(), 2);
        assert_eq!(heap.selector_count(), 0);
        assert_eq!(heap.edge_count(), 0);
        assert_eq!(heap.variable_count(), 0);
        assert!(heap.externals().is_empty());
        assert!(heap.validate().is_ok());
    }

    #[test]
    fn variables_unique() {
        let fx = fixture();
        let mut builder = HeapBuilder::new();
        let n = builder.add_node(fx.list);
        builder.add_variable("x", n).unwrap();
        assert!(matches!(
            builder.add_variable("x", n),
            Err(GraphError::DuplicateVariable(_))
        ));
        assert_eq!(builder.remove_variable("x").unwrap(), n);
        assert!(builder.remove_variable("x").is_err());
    }

    #[test]
    fn replace_nonterminal_edge_splices_rhs() {
        let fx = fixture();
        let rule = step_rule(&fx);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 2);
        let edge = builder
            .add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]])
            .unwrap();
        builder.add_variable("head", n[0]).unwrap();

        let splice = builder.replace_nonterminal_edge(edge, &rule).unwrap();
        let heap = builder.build();

        assert_eq!(splice.nodes.len(), 1);
        assert_eq!(splice.edges.len(), 1);
        assert_eq!(heap.node_count(), 3);
        assert_eq!(heap.selector_named(n[0], "next"), Some(splice.nodes[0]));
        let (_, remaining) = heap.nonterminal_edges().next().unwrap();
        assert_eq!(remaining.tentacles, vec![splice.nodes[0], n[1]]);
        assert!(heap.nonterminal_edge(edge).is_none());
        assert!(heap.validate().is_ok());
    }

    #[test]
    fn replace_nonterminal_edge_conflict_leaves_heap_untouched() {
        let fx = fixture();
        let rule = step_rule(&fx);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 2);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        let edge = builder
            .add_nonterminal_edge(fx.sll.clone(), vec![n[0], n[1]])
            .unwrap();
        let before = builder.heap().clone();

        let err = builder.replace_nonterminal_edge(edge, &rule).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateSelector { .. }));
        let after = builder.build();
        assert_eq!(after.node_count(), before.node_count());
        assert_eq!(after.edge_count(), before.edge_count());
        assert!(after.nonterminal_edge(edge).is_some());
    }

    #[test]
    fn replace_matching_folds_internal_structure() {
        let fx = fixture();
        let rule = step_rule(&fx);
        let rule_nodes: Vec<NodeId> = rule.nodes().collect();
        let (rule_edge, _) = rule.nonterminal_edges().next().unwrap();

        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        let target_edge = builder
            .add_nonterminal_edge(fx.sll.clone(), vec![n[1], n[2]])
            .unwrap();

        let nodes = BTreeMap::from([
            (rule_nodes[0], n[0]),
            (rule_nodes[1], n[2]),
            (rule_nodes[2], n[1]),
        ]);
        let edges = BTreeMap::from([(rule_edge, target_edge)]);
        let matching = Matching::new(&rule, nodes, edges);

        let folded = builder.replace_matching(&matching, fx.sll.clone()).unwrap();
        let heap = builder.build();
        assert_eq!(heap.node_count(), 2);
        assert_eq!(heap.selector_count(), 0);
        assert_eq!(heap.edge_count(), 1);
        assert_eq!(heap.nonterminal_edge(folded).unwrap().tentacles, vec![n[0], n[2]]);
        assert!(heap.validate().is_ok());
    }

    #[test]
    fn replace_matching_requires_total_matching() {
        let fx = fixture();
        let rule = step_rule(&fx);
        let mut builder = HeapBuilder::new();
        builder.add_nodes(fx.list, 3);
        let matching = Matching::new(&rule, BTreeMap::new(), BTreeMap::new());
        let err = builder.replace_matching(&matching, fx.sll.clone()).unwrap_err();
        assert!(matches!(err, GraphError::UnmappedPatternNode(_)));
        assert_eq!(builder.heap().edge_count(), 0);
    }

    #[test]
    fn replace_matching_rejects_merged_images() {
        let fx = fixture();
        // a -next-> c, b -next-> c with a and b both sent to t0
        let mut pattern = HeapBuilder::new();
        let p = pattern.add_nodes(fx.list, 3);
        pattern.add_selector(p[0], "next", p[2]).unwrap();
        pattern.add_selector(p[1], "next", p[2]).unwrap();
        pattern.set_external(p[0]).unwrap();
        pattern.set_external(p[2]).unwrap();
        let pattern = pattern.build();

        let mut builder = HeapBuilder::new();
        let t = builder.add_nodes(fx.list, 2);
        builder.add_selector(t[0], "next", t[1]).unwrap();
        let nodes = BTreeMap::from([(p[0], t[0]), (p[1], t[0]), (p[2], t[1])]);
        let matching = Matching::new(&pattern, nodes, BTreeMap::new());

        let err = builder.replace_matching(&matching, fx.sll.clone()).unwrap_err();
        assert!(matches!(err, GraphError::NonInjectiveMatching { .. }));
        let heap = builder.heap();
        assert_eq!(heap.node_count(), 2);
        assert_eq!(heap.selector_named(t[0], "next"), Some(t[1]));
        assert_eq!(heap.edge_count(), 0);
    }

    #[test]
    fn merge_externals_identifies_nodes() {
        let mut fx = fixture();
        let other = fx.session.declare_type("Tree", ["left"]);
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[0], "next", n[1]).unwrap();
        builder
            .add_nonterminal_edge(fx.sll.clone(), vec![n[1], n[2]])
            .unwrap();
        for &node in &n {
            builder.set_external(node).unwrap();
        }

        let mut rejected = builder.clone();
        assert!(rejected.merge_externals(&[0, 1]).is_err());
        assert!(rejected.merge_externals(&[0, 2, 2]).is_err());

        let positions = builder.merge_externals(&[0, 1, 0]).unwrap();
        assert_eq!(positions, vec![0, 1, 0]);
        let heap = builder.build();
        assert_eq!(heap.node_count(), 2);
        assert_eq!(heap.externals(), &[n[0], n[1]]);
        let (_, edge) = heap.nonterminal_edges().next().unwrap();
        assert_eq!(edge.tentacles, vec![n[1], n[0]]);
        assert!(heap.validate().is_ok());

        let mut mixed = HeapBuilder::new();
        let a = mixed.add_node(fx.list);
        let b = mixed.add_node(other);
        mixed.set_external(a).unwrap();
        mixed.set_external(b).unwrap();
        assert!(matches!(
            mixed.merge_externals(&[0, 0]),
            Err(GraphError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn merge_externals_rejects_colliding_selectors() {
        let fx = fixture();
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(fx.list, 3);
        builder.add_selector(n[0], "next", n[2]).unwrap();
        builder.add_selector(n[1], "next", n[2]).unwrap();
        builder.set_external(n[0]).unwrap();
        builder.set_external(n[1]).unwrap();
        assert!(matches!(
            builder.merge_externals(&[0, 0]),
            Err(GraphError::DuplicateSelector { .. })
        ));
        assert_eq!(builder.heap().node_count(), 3);
    }
}
