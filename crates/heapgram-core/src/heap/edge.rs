//! Nonterminal hyperedges.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use crate::nonterminal::Nonterminal;

/// Nonterminal edge identifier, unique within one heap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// A hyperedge labelled by a nonterminal and attached to an ordered list of
/// nodes (its tentacles).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonterminalEdge {
    pub label: Nonterminal,
    pub tentacles: Vec<NodeId>,
}

impl NonterminalEdge {
    pub fn new(label: Nonterminal, tentacles: Vec<NodeId>) -> Self {
        Self { label, tentacles }
    }

    pub fn rank(&self) -> usize {
        self.tentacles.len()
    }

    /// Tentacle positions at which `node` is attached.
    pub fn positions_of(&self, node: NodeId) -> impl Iterator<Item = usize> + '_ {
        self.tentacles
            .iter()
            .enumerate()
            .filter(move |(_, &n)| n == node)
            .map(|(i, _)| i)
    }
}

impl fmt::Display for NonterminalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tentacles: Vec<String> = self.tentacles.iter().map(|n| n.to_string()).collect();
        write!(f, "{}({})", self.label, tentacles.join(", "))
    }
}
