//! Hyperedge-replacement grammars.
//!
//! A grammar maps each nonterminal to an ordered list of right-hand sides.
//! External node `i` of a right-hand side is glued to tentacle `i` of the
//! replaced edge. Insertion order is kept: canonicalization applies the first
//! rule that matches.

use std::collections::HashMap;

use heapgram_core::{HeapConfiguration, Nonterminal};
use log::debug;

use crate::error::GrammarError;

/// A right-hand side in which some external nodes have been identified.
///
/// Used to fold structure whose interface nodes coincide, e.g. a list segment
/// that closes into a cycle.
#[derive(Debug, Clone)]
pub struct CollapsedRule {
    /// Position of the original right-hand side in its nonterminal's list.
    pub source: usize,
    /// The right-hand side after merging.
    pub heap: HeapConfiguration,
    /// For tentacle `i` of the nonterminal, the position of the collapsed
    /// external node it attaches to.
    pub external_map: Vec<usize>,
}

#[derive(Debug, Clone)]
struct Production {
    lhs: Nonterminal,
    rhs: Vec<HeapConfiguration>,
    collapsed: Vec<CollapsedRule>,
}

/// An immutable hyperedge-replacement grammar.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    productions: Vec<Production>,
    index: HashMap<Nonterminal, usize>,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    /// Nonterminals in insertion order.
    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.productions.iter().map(|p| &p.lhs)
    }

    pub fn contains(&self, lhs: &Nonterminal) -> bool {
        self.index.contains_key(lhs)
    }

    /// Right-hand sides of `lhs`; empty for nonterminals without rules.
    pub fn right_hand_sides(&self, lhs: &Nonterminal) -> &[HeapConfiguration] {
        self.index
            .get(lhs)
            .map(|&i| self.productions[i].rhs.as_slice())
            .unwrap_or(&[])
    }

    pub fn collapsed_right_hand_sides(&self, lhs: &Nonterminal) -> &[CollapsedRule] {
        self.index
            .get(lhs)
            .map(|&i| self.productions[i].collapsed.as_slice())
            .unwrap_or(&[])
    }

    /// All rules in grammar order.
    pub fn rules(&self) -> impl Iterator<Item = (&Nonterminal, &HeapConfiguration)> + '_ {
        self.productions
            .iter()
            .flat_map(|p| p.rhs.iter().map(move |rhs| (&p.lhs, rhs)))
    }

    /// All collapsed rules in grammar order.
    pub fn collapsed_rules(&self) -> impl Iterator<Item = (&Nonterminal, &CollapsedRule)> + '_ {
        self.productions
            .iter()
            .flat_map(|p| p.collapsed.iter().map(move |rule| (&p.lhs, rule)))
    }

    pub fn rule_count(&self) -> usize {
        self.productions.iter().map(|p| p.rhs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }
}

/// Incremental construction of a [`Grammar`].
///
/// Rules are validated as they are added. Collapsed variants are derived in
/// [`build`](Self::build) unless disabled.
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    productions: Vec<(Nonterminal, Vec<HeapConfiguration>)>,
    index: HashMap<Nonterminal, usize>,
    collapse: bool,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            productions: Vec::new(),
            index: HashMap::new(),
            collapse: true,
        }
    }

    /// Whether to derive collapsed right-hand sides.
    pub fn with_collapsed_rules(mut self, enabled: bool) -> Self {
        self.collapse = enabled;
        self
    }

    /// Add `lhs -> rhs`.
    ///
    /// Rejects right-hand sides that are inconsistent, whose external count
    /// differs from the rank of `lhs`, or that would not shrink a
    /// configuration when folded.
    ///
    /// Chain rules `A -> B(x, y)` fall in the last group: folding one only
    /// renames an edge, and a pair `A -> B`, `B -> A` would let
    /// canonicalization run forever. Inline `B`'s right-hand sides into `A`
    /// instead.
    pub fn add_rule(&mut self, lhs: Nonterminal, rhs: HeapConfiguration) -> Result<(), GrammarError> {
        rhs.validate()?;
        if rhs.externals().len() != lhs.rank() {
            return Err(GrammarError::RankMismatch {
                label: lhs.to_string(),
                expected: lhs.rank(),
                found: rhs.externals().len(),
            });
        }
        if !is_reducing(&rhs) {
            return Err(GrammarError::NonReducingRule {
                label: lhs.to_string(),
            });
        }
        let slot = match self.index.get(&lhs) {
            Some(&slot) => slot,
            None => {
                self.index.insert(lhs.clone(), self.productions.len());
                self.productions.push((lhs, Vec::new()));
                self.productions.len() - 1
            }
        };
        self.productions[slot].1.push(rhs);
        Ok(())
    }

    pub fn build(self) -> Grammar {
        let collapse = self.collapse;
        let productions = self
            .productions
            .into_iter()
            .map(|(lhs, rhs)| {
                let collapsed = if collapse {
                    collapsed_variants(&lhs, &rhs)
                } else {
                    Vec::new()
                };
                Production { lhs, rhs, collapsed }
            })
            .collect();
        Grammar {
            productions,
            index: self.index,
        }
    }
}

/// Folding a right-hand side removes its selectors, internal nodes and
/// nonterminal edges and adds one edge. A rule without selectors and with at
/// most one internal node or edge gains nothing from that.
fn is_reducing(rhs: &HeapConfiguration) -> bool {
    let internal = rhs.nodes().filter(|&n| !rhs.is_external(n)).count();
    rhs.selector_count() > 0 || internal + rhs.edge_count() > 1
}

fn collapsed_variants(lhs: &Nonterminal, rhs: &[HeapConfiguration]) -> Vec<CollapsedRule> {
    let mut variants = Vec::new();
    for (source, heap) in rhs.iter().enumerate() {
        for partition in external_partitions(lhs, heap) {
            let mut builder = heap.clone().builder();
            match builder.merge_externals(&partition) {
                Ok(external_map) => variants.push(CollapsedRule {
                    source,
                    heap: builder.build(),
                    external_map,
                }),
                Err(err) => debug!("no collapsed variant of {lhs} rule {source} for {partition:?}: {err}"),
            }
        }
    }
    variants
}

/// Non-trivial partitions of the external positions, as representative maps.
///
/// A block only joins externals of one type and holds at most one
/// non-reduction tentacle.
fn external_partitions(lhs: &Nonterminal, rhs: &HeapConfiguration) -> Vec<Vec<usize>> {
    let externals = rhs.externals();
    let mut partitions = Vec::new();
    let mut stack: Vec<Vec<usize>> = vec![Vec::new()];
    while let Some(prefix) = stack.pop() {
        let i = prefix.len();
        if i == externals.len() {
            if prefix.iter().enumerate().any(|(j, &rep)| j != rep) {
                partitions.push(prefix);
            }
            continue;
        }
        let ty = rhs.type_of(externals[i]);
        for rep in (0..i).filter(|&j| prefix[j] == j) {
            if rhs.type_of(externals[rep]) != ty {
                continue;
            }
            let crowded = !lhs.is_reduction_tentacle(i)
                && (0..i).any(|j| prefix[j] == rep && !lhs.is_reduction_tentacle(j));
            if crowded {
                continue;
            }
            let mut joined = prefix.clone();
            joined.push(rep);
            stack.push(joined);
        }
        let mut alone = prefix;
        alone.push(i);
        stack.push(alone);
    }
    partitions
}
