//! Materialization: unfold nonterminal edges until the selectors a statement
//! is about to dereference are concrete.
//!
//! For a violation point `(x, sel)` whose node lacks `sel`, every nonterminal
//! edge attached to that node at a non-reduction tentacle is unfolded with
//! each rule that puts `sel` on the matching external node. When no rule does
//! so directly, rules that defer `sel` to one of their own nonterminal edges
//! are applied and the search continues among the freshly spliced edges only.
//!
//! Deferral is guided by precomputed levels: level 0 means some right-hand
//! side provides the selector directly, level `k + 1` means it can be handed
//! to an edge of level `k`. Every deferring step strictly lowers the level,
//! so the worklist always drains.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use heapgram_core::{EdgeId, GraphError, HeapConfiguration, NodeId, Nonterminal, Splice};
use log::{debug, trace};

use crate::error::GrammarError;
use crate::grammar::Grammar;

/// Selector accesses `(variable, selector)` that must be concrete before a
/// statement can execute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationPoints {
    points: BTreeMap<String, BTreeSet<String>>,
}

impl ViolationPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, variable: impl Into<String>, selector: impl Into<String>) {
        self.points
            .entry(variable.into())
            .or_default()
            .insert(selector.into());
    }

    pub fn with(mut self, variable: impl Into<String>, selector: impl Into<String>) -> Self {
        self.add(variable, selector);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.points
            .iter()
            .flat_map(|(var, sels)| sels.iter().map(move |sel| (var.as_str(), sel.as_str())))
    }

    pub fn len(&self) -> usize {
        self.points.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points whose variable is bound to a node lacking the selector.
    pub fn unsatisfied_in<'a>(
        &'a self,
        heap: &'a HeapConfiguration,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter(move |&(var, sel)| {
            heap.variable_target(var)
                .is_some_and(|node| heap.selector_named(node, sel).is_none())
        })
    }
}

/// Result of materializing one heap.
#[derive(Debug, Clone)]
pub struct Materialized {
    /// The alternatives; the input itself when nothing was unfolded.
    pub heaps: Vec<HeapConfiguration>,
    /// Number of rule applications performed.
    pub unfoldings: usize,
}

impl Materialized {
    pub fn is_unchanged(&self) -> bool {
        self.unfoldings == 0
    }
}

type LevelKey = (Nonterminal, usize, String);

/// Grammar-driven materialization.
#[derive(Debug, Clone)]
pub struct Materializer<'g> {
    grammar: &'g Grammar,
    levels: HashMap<LevelKey, usize>,
}

struct Pending {
    heap: HeapConfiguration,
    /// Edges spliced by the deferring rule that produced this heap.
    fresh: Option<BTreeSet<EdgeId>>,
    bound: usize,
}

impl<'g> Materializer<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            levels: deferral_levels(grammar),
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// How many deferring steps it takes at least to obtain `selector` at
    /// tentacle `tentacle` of a `lhs` edge; `None` if no derivation provides it.
    pub fn deferral_level(&self, lhs: &Nonterminal, tentacle: usize, selector: &str) -> Option<usize> {
        self.levels
            .get(&(lhs.clone(), tentacle, selector.to_string()))
            .copied()
    }

    /// Materialize `heap` at every violation point, one point after another.
    pub fn materialize(
        &self,
        heap: &HeapConfiguration,
        points: &ViolationPoints,
    ) -> Result<Materialized, GrammarError> {
        let mut heaps = vec![heap.clone()];
        let mut unfoldings = 0;
        for (variable, selector) in points.iter() {
            let mut next = Vec::with_capacity(heaps.len());
            for current in heaps {
                let (resolved, count) = self.resolve(current, variable, selector)?;
                unfoldings += count;
                next.extend(resolved);
            }
            heaps = next;
        }
        if unfoldings > 0 {
            debug!(
                "materialized {} point(s) into {} heap(s) with {unfoldings} unfolding(s)",
                points.len(),
                heaps.len()
            );
        }
        Ok(Materialized { heaps, unfoldings })
    }

    fn resolve(
        &self,
        heap: HeapConfiguration,
        variable: &str,
        selector: &str,
    ) -> Result<(Vec<HeapConfiguration>, usize), GrammarError> {
        let Some(node) = heap.variable_target(variable) else {
            return Ok((vec![heap], 0));
        };
        if heap.selector_named(node, selector).is_some() {
            return Ok((vec![heap], 0));
        }

        let mut resolved = Vec::new();
        let mut unfoldings = 0;
        let mut work = vec![Pending {
            heap: heap.clone(),
            fresh: None,
            bound: usize::MAX,
        }];
        while let Some(pending) = work.pop() {
            for (edge, tentacle, label) in candidate_edges(&pending, node) {
                let rules = self.grammar.right_hand_sides(&label);
                let direct: Vec<&HeapConfiguration> = rules
                    .iter()
                    .filter(|rhs| provides(rhs, tentacle, selector))
                    .collect();
                if !direct.is_empty() {
                    for rhs in direct {
                        if let Some((unfolded, _)) = unfold(&pending.heap, edge, rhs)? {
                            unfoldings += 1;
                            resolved.push(unfolded);
                        }
                    }
                    continue;
                }
                for rhs in rules {
                    let Some(level) = rhs_level(&self.levels, rhs, tentacle, selector) else {
                        continue;
                    };
                    if level >= pending.bound {
                        continue;
                    }
                    if let Some((unfolded, splice)) = unfold(&pending.heap, edge, rhs)? {
                        trace!("deferred {variable}.{selector} into {} fresh edge(s) at level {level}", splice.edges.len());
                        unfoldings += 1;
                        work.push(Pending {
                            heap: unfolded,
                            fresh: Some(splice.edges.into_iter().collect()),
                            bound: level,
                        });
                    }
                }
            }
        }

        if resolved.is_empty() {
            debug!("{variable}.{selector} cannot be materialized; left undefined");
            return Ok((vec![heap], 0));
        }
        Ok((resolved, unfoldings))
    }
}

/// Edges attached to `node` at a non-reduction tentacle, restricted to the
/// fresh edges of a deferred heap.
fn candidate_edges(pending: &Pending, node: NodeId) -> Vec<(EdgeId, usize, Nonterminal)> {
    let heap = &pending.heap;
    let mut candidates = Vec::new();
    for id in heap.attached_edges(node) {
        if pending.fresh.as_ref().is_some_and(|fresh| !fresh.contains(&id)) {
            continue;
        }
        let Some(edge) = heap.nonterminal_edge(id) else {
            continue;
        };
        for tentacle in edge.positions_of(node) {
            if !edge.label.is_reduction_tentacle(tentacle) {
                candidates.push((id, tentacle, edge.label.clone()));
            }
        }
    }
    candidates
}

fn provides(rhs: &HeapConfiguration, position: usize, selector: &str) -> bool {
    rhs.externals()
        .get(position)
        .is_some_and(|&node| rhs.selector_named(node, selector).is_some())
}

/// Replace `edge` by `rhs` in a copy of `heap`. Rules that would duplicate a
/// selector or variable are not applicable here; other failures mean grammar
/// and heap disagree and are reported.
fn unfold(
    heap: &HeapConfiguration,
    edge: EdgeId,
    rhs: &HeapConfiguration,
) -> Result<Option<(HeapConfiguration, Splice)>, GrammarError> {
    let mut builder = heap.clone().builder();
    match builder.replace_nonterminal_edge(edge, rhs) {
        Ok(splice) => Ok(Some((builder.build(), splice))),
        Err(err @ (GraphError::DuplicateSelector { .. } | GraphError::DuplicateVariable(_))) => {
            debug!("rule not applicable to {edge}: {err}");
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}

fn rhs_level(
    levels: &HashMap<LevelKey, usize>,
    rhs: &HeapConfiguration,
    position: usize,
    selector: &str,
) -> Option<usize> {
    let node = *rhs.externals().get(position)?;
    if rhs.selector_named(node, selector).is_some() {
        return Some(0);
    }
    let mut best: Option<usize> = None;
    for id in rhs.attached_edges(node) {
        let Some(edge) = rhs.nonterminal_edge(id) else {
            continue;
        };
        for tentacle in edge.positions_of(node) {
            if edge.label.is_reduction_tentacle(tentacle) {
                continue;
            }
            let key = (edge.label.clone(), tentacle, selector.to_string());
            if let Some(&level) = levels.get(&key) {
                best = Some(best.map_or(level + 1, |b| b.min(level + 1)));
            }
        }
    }
    best
}

fn deferral_levels(grammar: &Grammar) -> HashMap<LevelKey, usize> {
    let selectors: BTreeSet<String> = grammar
        .rules()
        .flat_map(|(_, rhs)| rhs.selectors().map(|(_, label, _)| label.name().to_string()))
        .collect();
    let mut levels: HashMap<LevelKey, usize> = HashMap::new();
    let mut changed = true;
    while changed {
        changed = false;
        for (lhs, rhs) in grammar.rules() {
            for position in 0..rhs.externals().len() {
                for selector in &selectors {
                    let Some(level) = rhs_level(&levels, rhs, position, selector) else {
                        continue;
                    };
                    let key = (lhs.clone(), position, selector.clone());
                    if levels.get(&key).is_some_and(|&old| old <= level) {
                        continue;
                    }
                    levels.insert(key, level);
                    changed = true;
                }
            }
        }
    }
    levels
}
