//! Language inclusion between abstract heaps, used for subsumption.

use heapgram_core::{is_constant, EdgeId, HeapConfiguration};
use heapgram_match::is_isomorphic;
use log::trace;

use crate::grammar::Grammar;

/// Decides whether the heaps represented by one configuration are among
/// those represented by another.
pub trait InclusionStrategy {
    fn is_included_in(&self, candidate: &HeapConfiguration, abstraction: &HeapConfiguration) -> bool;
}

/// Sound but incomplete inclusion check for min-distance abstractions.
///
/// `candidate` is included in `abstraction` if both are isomorphic or if
/// unfolding some of the critical edges of `abstraction` once each yields a
/// configuration isomorphic to `candidate`. Critical edges are those with a
/// reduction tentacle on a node named by a non-constant variable.
#[derive(Debug, Clone)]
pub struct MinDistanceInclusion<'g> {
    grammar: &'g Grammar,
}

impl<'g> MinDistanceInclusion<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }
}

impl InclusionStrategy for MinDistanceInclusion<'_> {
    fn is_included_in(&self, candidate: &HeapConfiguration, abstraction: &HeapConfiguration) -> bool {
        if is_isomorphic(candidate, abstraction) {
            return true;
        }
        let critical = critical_edges(abstraction);
        if critical.is_empty() {
            return false;
        }

        // Each critical edge is either left alone or unfolded once.
        let mut stack = vec![(abstraction.clone(), 0usize)];
        while let Some((heap, next)) = stack.pop() {
            let Some(&edge) = critical.get(next) else {
                continue;
            };
            stack.push((heap.clone(), next + 1));
            let Some(label) = heap.nonterminal_edge(edge).map(|e| e.label.clone()) else {
                continue;
            };
            for rhs in self.grammar.right_hand_sides(&label) {
                let mut builder = heap.clone().builder();
                if builder.replace_nonterminal_edge(edge, rhs).is_err() {
                    continue;
                }
                let unfolded = builder.build();
                // unfolding never removes nodes
                if unfolded.node_count() > candidate.node_count() {
                    continue;
                }
                if is_isomorphic(candidate, &unfolded) {
                    trace!("inclusion witnessed by unfolding {edge}");
                    return true;
                }
                stack.push((unfolded, next + 1));
            }
        }
        false
    }
}

fn critical_edges(heap: &HeapConfiguration) -> Vec<EdgeId> {
    heap.nonterminal_edges()
        .filter(|(_, edge)| {
            edge.tentacles.iter().enumerate().any(|(i, &node)| {
                edge.label.is_reduction_tentacle(i)
                    && heap.variables_at(node).any(|name| !is_constant(name))
            })
        })
        .map(|(id, _)| id)
        .collect()
}
