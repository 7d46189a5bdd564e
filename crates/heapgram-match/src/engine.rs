//! Backtracking search driver.
//!
//! The search keeps its own frame stack instead of recursing, so the depth of
//! a search is bounded by heap memory rather than the call stack. A single
//! search is never interrupted: callers that support cancellation check for it
//! between searches.

use std::collections::BTreeMap;

use heapgram_core::{HeapConfiguration, Matching};
use log::trace;

use crate::feasibility::{Admissibility, Feasibility};
use crate::graph::{Element, GraphData};
use crate::state::SearchState;

/// The matching variants offered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingKind {
    /// Total bijection; external positions must agree.
    Isomorphism,
    /// Every pattern element is mapped; the target may contain more structure
    /// around the images of external nodes.
    Embedding,
    /// Embedding that keeps pattern nodes with outgoing selectors away from
    /// target externals and variable-referenced nodes.
    MinDistanceEmbedding { protect_constants: bool },
    /// Embedding that keeps pattern nodes with outgoing selectors at least
    /// `depth` selector hops away from variable-referenced nodes; constants
    /// count as variables when protected.
    MinDepthEmbedding {
        depth: usize,
        protect_constants: bool,
    },
    /// Embedding that stops at the first matching found.
    Precondition,
}

impl MatchingKind {
    fn is_isomorphism(self) -> bool {
        matches!(self, MatchingKind::Isomorphism)
    }

    fn stops_at_first(self) -> bool {
        matches!(self, MatchingKind::Precondition)
    }
}

struct Frame {
    pattern_vertex: usize,
    candidates: Vec<usize>,
    next: usize,
    applied: Option<usize>,
}

/// A search for matchings of `pattern` in `target`.
pub struct MatchingSearch<'p, 't> {
    pattern: &'p HeapConfiguration,
    target: &'t HeapConfiguration,
    kind: MatchingKind,
}

impl<'p, 't> MatchingSearch<'p, 't> {
    pub fn new(
        pattern: &'p HeapConfiguration,
        target: &'t HeapConfiguration,
        kind: MatchingKind,
    ) -> Self {
        Self {
            pattern,
            target,
            kind,
        }
    }

    /// The first matching in search order, if any.
    pub fn first(&self) -> Option<Matching<'p>> {
        self.run(Some(1)).into_iter().next()
    }

    /// Whether at least one matching exists.
    pub fn exists(&self) -> bool {
        self.first().is_some()
    }

    /// All matchings (only the first one for [`MatchingKind::Precondition`]).
    pub fn all(&self) -> Vec<Matching<'p>> {
        let limit = self.kind.stops_at_first().then_some(1);
        self.run(limit)
    }

    fn run(&self, limit: Option<usize>) -> Vec<Matching<'p>> {
        let pg = GraphData::new(self.pattern);
        let tg = GraphData::new(self.target);
        let mut found = Vec::new();
        if !self.possible(&pg, &tg) {
            return found;
        }

        let admissibility = match self.kind {
            MatchingKind::MinDistanceEmbedding { protect_constants } => {
                Admissibility::Distance { protect_constants }
            }
            MatchingKind::MinDepthEmbedding {
                depth,
                protect_constants,
            } => Admissibility::Depth {
                depth,
                distances: tg.variable_distances(protect_constants),
            },
            _ => Admissibility::Unrestricted,
        };
        let feasibility = Feasibility {
            pattern: &pg,
            target: &tg,
            isomorphism: self.kind.is_isomorphism(),
            admissibility: &admissibility,
        };

        let mut state = SearchState::new(&pg, &tg);
        if pg.len() == 0 {
            found.push(self.extract(&pg, &tg, &state));
            return found;
        }
        let mut stack = Vec::new();
        if let Some((pattern_vertex, candidates)) = state.next_candidates(&pg, &tg) {
            stack.push(Frame {
                pattern_vertex,
                candidates,
                next: 0,
                applied: None,
            });
        }

        let mut steps = 0usize;
        while let Some(frame) = stack.last_mut() {
            let p = frame.pattern_vertex;
            if let Some(t) = frame.applied.take() {
                state.remove_pair(&pg, &tg, p, t);
            }
            let mut extended = false;
            while frame.next < frame.candidates.len() {
                let t = frame.candidates[frame.next];
                frame.next += 1;
                steps += 1;
                if feasibility.check(&state, p, t) {
                    state.add_pair(&pg, &tg, p, t);
                    frame.applied = Some(t);
                    extended = true;
                    break;
                }
            }
            if !extended {
                stack.pop();
                continue;
            }
            if state.depth == pg.len() {
                found.push(self.extract(&pg, &tg, &state));
                if limit.is_some_and(|limit| found.len() >= limit) {
                    break;
                }
                continue;
            }
            if let Some((pattern_vertex, candidates)) = state.next_candidates(&pg, &tg) {
                stack.push(Frame {
                    pattern_vertex,
                    candidates,
                    next: 0,
                    applied: None,
                });
            }
        }

        trace!(
            "{:?}: {} matching(s) of {} pattern vertices in {} target vertices after {} steps",
            self.kind,
            found.len(),
            pg.len(),
            tg.len(),
            steps
        );
        found
    }

    /// Cheap necessary conditions checked before searching.
    fn possible(&self, pg: &GraphData<'_>, tg: &GraphData<'_>) -> bool {
        if self.kind.is_isomorphism() {
            return pg.len() == tg.len()
                && self.pattern.externals().len() == self.target.externals().len()
                && pg.label_histogram() == tg.label_histogram();
        }
        if pg.len() > tg.len() {
            return false;
        }
        let available = tg.label_histogram();
        pg.label_histogram()
            .iter()
            .all(|(label, &count)| available.get(label).is_some_and(|&have| have >= count))
    }

    fn extract(&self, pg: &GraphData<'_>, tg: &GraphData<'_>, state: &SearchState) -> Matching<'p> {
        let mut nodes = BTreeMap::new();
        let mut edges = BTreeMap::new();
        for (p, image) in state.pattern.core.iter().enumerate() {
            let Some(t) = *image else { continue };
            match (pg.elements[p], tg.elements[t]) {
                (Element::Node(pn), Element::Node(tn)) => {
                    nodes.insert(pn, tn);
                }
                (Element::Edge(pe), Element::Edge(te)) => {
                    edges.insert(pe, te);
                }
                _ => {}
            }
        }
        Matching::new(self.pattern, nodes, edges)
    }
}
