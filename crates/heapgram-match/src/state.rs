//! Partial mapping plus VF2 terminal sets.
//!
//! Terminal-set membership is stored as the search depth at which a vertex
//! entered the set (0 = not a member), so undoing the most recent pair only
//! has to clear the entries stamped with the current depth.

use crate::graph::GraphData;

#[derive(Debug, Clone)]
pub(crate) struct Side {
    pub core: Vec<Option<usize>>,
    pub term_out: Vec<usize>,
    pub term_in: Vec<usize>,
}

impl Side {
    fn new(len: usize) -> Self {
        Self {
            core: vec![None; len],
            term_out: vec![0; len],
            term_in: vec![0; len],
        }
    }

    pub fn is_matched(&self, v: usize) -> bool {
        self.core[v].is_some()
    }

    pub fn in_out_set(&self, v: usize) -> bool {
        self.term_out[v] != 0 && self.core[v].is_none()
    }

    pub fn in_in_set(&self, v: usize) -> bool {
        self.term_in[v] != 0 && self.core[v].is_none()
    }

    fn stamp(&mut self, graph: &GraphData<'_>, v: usize, depth: usize) {
        if self.term_out[v] == 0 {
            self.term_out[v] = depth;
        }
        if self.term_in[v] == 0 {
            self.term_in[v] = depth;
        }
        for &u in graph.succ[v].keys() {
            if self.term_out[u] == 0 {
                self.term_out[u] = depth;
            }
        }
        for &u in graph.pred[v].keys() {
            if self.term_in[u] == 0 {
                self.term_in[u] = depth;
            }
        }
    }

    fn unstamp(&mut self, graph: &GraphData<'_>, v: usize, depth: usize) {
        let neighbours = graph.succ[v].keys().chain(graph.pred[v].keys());
        for &u in std::iter::once(&v).chain(neighbours) {
            if self.term_out[u] == depth {
                self.term_out[u] = 0;
            }
            if self.term_in[u] == depth {
                self.term_in[u] = 0;
            }
        }
    }
}

/// The search state shared by all matching variants.
#[derive(Debug, Clone)]
pub(crate) struct SearchState {
    pub pattern: Side,
    pub target: Side,
    pub depth: usize,
}

impl SearchState {
    pub fn new(pattern: &GraphData<'_>, target: &GraphData<'_>) -> Self {
        Self {
            pattern: Side::new(pattern.len()),
            target: Side::new(target.len()),
            depth: 0,
        }
    }

    pub fn add_pair(&mut self, pg: &GraphData<'_>, tg: &GraphData<'_>, p: usize, t: usize) {
        self.depth += 1;
        self.pattern.core[p] = Some(t);
        self.target.core[t] = Some(p);
        self.pattern.stamp(pg, p, self.depth);
        self.target.stamp(tg, t, self.depth);
    }

    pub fn remove_pair(&mut self, pg: &GraphData<'_>, tg: &GraphData<'_>, p: usize, t: usize) {
        self.pattern.unstamp(pg, p, self.depth);
        self.target.unstamp(tg, t, self.depth);
        self.pattern.core[p] = None;
        self.target.core[t] = None;
        self.depth -= 1;
    }

    /// Next pattern vertex to extend the mapping with and its target candidates.
    ///
    /// Out-terminal vertices come first, then in-terminal ones; only when the
    /// mapping has no frontier are all unmatched vertices considered.
    pub fn next_candidates(&self, pg: &GraphData<'_>, tg: &GraphData<'_>) -> Option<(usize, Vec<usize>)> {
        let unmatched_p = || (0..pg.len()).filter(|&v| !self.pattern.is_matched(v));
        if let Some(p) = unmatched_p().find(|&v| self.pattern.in_out_set(v)) {
            let candidates = (0..tg.len()).filter(|&u| self.target.in_out_set(u)).collect();
            return Some((p, candidates));
        }
        if let Some(p) = unmatched_p().find(|&v| self.pattern.in_in_set(v)) {
            let candidates = (0..tg.len()).filter(|&u| self.target.in_in_set(u)).collect();
            return Some((p, candidates));
        }
        let p = unmatched_p().next()?;
        let candidates = (0..tg.len()).filter(|&u| !self.target.is_matched(u)).collect();
        Some((p, candidates))
    }
}
