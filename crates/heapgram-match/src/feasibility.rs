//! Feasibility rules for extending a partial mapping with a candidate pair.

use std::collections::BTreeMap;

use heapgram_core::is_constant;

use crate::graph::{Arcs, GraphData};
use crate::state::{SearchState, Side};

/// How a variant restricts nodes that are about to be dereferenced.
#[derive(Debug, Clone)]
pub(crate) enum Admissibility {
    Unrestricted,
    /// Pattern nodes with outgoing selectors may not land on target externals
    /// or on nodes referenced by variables.
    Distance { protect_constants: bool },
    /// Pattern nodes with outgoing selectors may not land within `depth`
    /// selector hops of a variable-referenced node.
    Depth { depth: usize, distances: Vec<usize> },
}

pub(crate) struct Feasibility<'a, 'p, 't> {
    pub pattern: &'a GraphData<'p>,
    pub target: &'a GraphData<'t>,
    pub isomorphism: bool,
    pub admissibility: &'a Admissibility,
}

impl Feasibility<'_, '_, '_> {
    /// Whether pattern vertex `p` must be matched with its whole neighbourhood.
    fn exact(&self, p: usize) -> bool {
        self.isomorphism || !self.pattern.is_external(p)
    }

    pub fn check(&self, state: &SearchState, p: usize, t: usize) -> bool {
        self.labels(p, t)
            && self.externals(p, t)
            && self.admissible(p, t)
            && self.degrees(p, t)
            && self.arcs(state, p, t)
            && self.lookahead(state, p, t)
    }

    fn labels(&self, p: usize, t: usize) -> bool {
        self.pattern.labels[p] == self.target.labels[t]
    }

    fn externals(&self, p: usize, t: usize) -> bool {
        if self.isomorphism {
            return self.pattern.external[p] == self.target.external[t];
        }
        if self.pattern.is_node(p) && !self.pattern.is_external(p) {
            return !self.target.is_external(t);
        }
        true
    }

    fn admissible(&self, p: usize, t: usize) -> bool {
        if !self.pattern.is_node(p) || !self.pattern.has_selectors(p) {
            return true;
        }
        match self.admissibility {
            Admissibility::Unrestricted => true,
            Admissibility::Distance { protect_constants } => {
                !self.target.is_external(t)
                    && self
                        .target
                        .variables_at(t)
                        .all(|name| !*protect_constants && is_constant(name))
            }
            Admissibility::Depth { depth, distances } => distances[t] >= *depth,
        }
    }

    fn degrees(&self, p: usize, t: usize) -> bool {
        let (ps, pp) = (&self.pattern.succ[p], &self.pattern.pred[p]);
        let (ts, tp) = (&self.target.succ[t], &self.target.pred[t]);
        if self.exact(p) {
            ps.len() == ts.len() && pp.len() == tp.len()
        } else {
            ps.len() <= ts.len() && pp.len() <= tp.len()
        }
    }

    /// Arcs between the candidates and already-matched vertices must agree.
    fn arcs(&self, state: &SearchState, p: usize, t: usize) -> bool {
        self.arcs_one_way(state, p, t, &self.pattern.succ, &self.target.succ)
            && self.arcs_one_way(state, p, t, &self.pattern.pred, &self.target.pred)
    }

    fn arcs_one_way(
        &self,
        state: &SearchState,
        p: usize,
        t: usize,
        pattern_adj: &[BTreeMap<usize, Arcs<'_>>],
        target_adj: &[BTreeMap<usize, Arcs<'_>>],
    ) -> bool {
        // Self loops are only visible while the pair itself is being added.
        let pattern_loop = pattern_adj[p].get(&p);
        let target_loop = target_adj[t].get(&t);
        match (pattern_loop, target_loop) {
            (Some(pl), Some(tl)) if !compatible(pl, tl, self.exact(p)) => return false,
            (Some(_), None) => return false,
            (None, Some(_)) if self.exact(p) => return false,
            _ => {}
        }

        for (&q, pattern_labels) in &pattern_adj[p] {
            let Some(u) = state.pattern.core[q] else { continue };
            let Some(target_labels) = target_adj[t].get(&u) else {
                return false;
            };
            if !compatible(pattern_labels, target_labels, self.exact(p) || self.exact(q)) {
                return false;
            }
        }
        for (&u, target_labels) in &target_adj[t] {
            let Some(q) = state.target.core[u] else { continue };
            if !(self.exact(p) || self.exact(q)) {
                continue;
            }
            match pattern_adj[p].get(&q) {
                Some(pattern_labels) if pattern_labels == target_labels => {}
                _ => return false,
            }
        }
        true
    }

    /// One-step look-ahead on terminal-set and unmatched neighbour counts.
    fn lookahead(&self, state: &SearchState, p: usize, t: usize) -> bool {
        let pc = neighbour_counts(&state.pattern, &self.pattern.succ[p], &self.pattern.pred[p]);
        let tc = neighbour_counts(&state.target, &self.target.succ[t], &self.target.pred[t]);
        if self.isomorphism {
            return pc == tc;
        }
        let within = pc.iter().zip(tc.iter()).all(|(a, b)| a <= b);
        if !within {
            return false;
        }
        if self.exact(p) {
            // unmatched neighbour totals (succ and pred) must agree
            pc[2] == tc[2] && pc[5] == tc[5]
        } else {
            true
        }
    }
}

fn compatible(pattern: &Arcs<'_>, target: &Arcs<'_>, exact: bool) -> bool {
    if exact {
        pattern == target
    } else {
        pattern.iter().all(|label| target.contains(label))
    }
}

/// `[succ in T_out, succ in T_in, succ unmatched, pred in T_out, pred in T_in, pred unmatched]`
fn neighbour_counts(
    side: &Side,
    succ: &BTreeMap<usize, Arcs<'_>>,
    pred: &BTreeMap<usize, Arcs<'_>>,
) -> [usize; 6] {
    let mut counts = [0; 6];
    for (offset, adj) in [(0, succ), (3, pred)] {
        for &u in adj.keys() {
            if side.in_out_set(u) {
                counts[offset] += 1;
            }
            if side.in_in_set(u) {
                counts[offset + 1] += 1;
            }
            if !side.is_matched(u) {
                counts[offset + 2] += 1;
            }
        }
    }
    counts
}
