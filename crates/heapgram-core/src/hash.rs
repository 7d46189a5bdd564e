//! Content hashing for heap configurations.
//!
//! The structural hash covers types, labels, variable names, tentacle
//! positions and external positions, but never node or edge ids. Isomorphic
//! configurations therefore hash equally, which lets a state space bucket
//! candidates before running the (expensive) isomorphism check.

use sha2::{Digest, Sha256};

use crate::heap::node::{NodeId, SelectorLabel};
use crate::heap::HeapConfiguration;
use crate::nonterminal::Nonterminal;
use crate::session::TypeId;

/// A 32-byte SHA-256 content hash.
pub type ContentHash = [u8; 32];

/// Format a content hash as a hex string.
pub fn hash_hex(hash: &ContentHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Renumbering-invariant description of one node's neighbourhood.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct NodeSignature<'a> {
    ty: TypeId,
    external: Option<usize>,
    outgoing: Vec<(&'a SelectorLabel, TypeId)>,
    incoming: Vec<(&'a SelectorLabel, TypeId)>,
    variables: Vec<&'a str>,
    tentacles: Vec<(&'a Nonterminal, usize)>,
}

impl NodeSignature<'_> {
    fn feed(&self, hasher: &mut Sha256) {
        feed_u64(hasher, self.ty.0.into());
        match self.external {
            Some(i) => {
                hasher.update([1]);
                feed_u64(hasher, i as u64);
            }
            None => hasher.update([0]),
        }
        for selectors in [&self.outgoing, &self.incoming] {
            feed_u64(hasher, selectors.len() as u64);
            for (label, ty) in selectors {
                feed_label(hasher, label);
                feed_u64(hasher, ty.0.into());
            }
        }
        feed_u64(hasher, self.variables.len() as u64);
        for name in &self.variables {
            feed_str(hasher, name);
        }
        feed_u64(hasher, self.tentacles.len() as u64);
        for (label, position) in &self.tentacles {
            feed_str(hasher, &label.to_string());
            feed_u64(hasher, *position as u64);
        }
    }
}

fn feed_u64(hasher: &mut Sha256, value: u64) {
    hasher.update(value.to_le_bytes());
}

// Length-prefixed so that adjacent strings cannot run together.
fn feed_str(hasher: &mut Sha256, value: &str) {
    feed_u64(hasher, value.len() as u64);
    hasher.update(value.as_bytes());
}

fn feed_label(hasher: &mut Sha256, label: &SelectorLabel) {
    feed_str(hasher, label.name());
    match label.annotation() {
        Some(annotation) => {
            hasher.update([1]);
            feed_str(hasher, annotation);
        }
        None => hasher.update([0]),
    }
}

fn node_signature(heap: &HeapConfiguration, node: NodeId) -> Option<NodeSignature<'_>> {
    let data = heap.node(node)?;
    let type_of = |n: NodeId| heap.type_of(n);

    let mut outgoing: Vec<_> = data
        .selectors()
        .filter_map(|(label, to)| Some((label, type_of(to)?)))
        .collect();
    outgoing.sort();
    let mut incoming: Vec<_> = heap
        .predecessors(node)
        .into_iter()
        .filter_map(|(from, label)| Some((label, type_of(from)?)))
        .collect();
    incoming.sort();
    let mut variables: Vec<&str> = heap.variables_at(node).collect();
    variables.sort();
    let mut tentacles: Vec<_> = heap
        .attached_edges(node)
        .filter_map(|id| heap.nonterminal_edge(id))
        .flat_map(|edge| edge.positions_of(node).map(move |i| (&edge.label, i)))
        .collect();
    tentacles.sort();

    Some(NodeSignature {
        ty: data.ty,
        external: heap.external_index(node),
        outgoing,
        incoming,
        variables,
        tentacles,
    })
}

/// Hash of a configuration that is invariant under renaming of node and edge ids.
pub fn structural_hash(heap: &HeapConfiguration) -> ContentHash {
    let mut signatures: Vec<NodeSignature<'_>> = heap
        .nodes()
        .filter_map(|node| node_signature(heap, node))
        .collect();
    signatures.sort();
    let mut labels: Vec<&Nonterminal> = heap.nonterminal_edges().map(|(_, e)| &e.label).collect();
    labels.sort();

    let mut hasher = Sha256::new();
    feed_u64(&mut hasher, signatures.len() as u64);
    for signature in &signatures {
        signature.feed(&mut hasher);
    }
    feed_u64(&mut hasher, labels.len() as u64);
    for label in labels {
        feed_str(&mut hasher, &label.to_string());
    }
    hasher.finalize().into()
}
