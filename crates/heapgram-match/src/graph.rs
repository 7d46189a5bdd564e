//! Labelled-digraph encoding of a heap configuration for the search.
//!
//! Nodes, nonterminal edges and variable edges all become vertices. Arcs run
//! node -> node for selectors, nonterminal -> node for tentacles (labelled
//! with the tentacle index) and variable -> node for variable targets.

use std::collections::{BTreeMap, VecDeque};

use heapgram_core::{is_constant, EdgeId, HeapConfiguration, Nonterminal, NodeId, SelectorLabel, TypeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum VertexLabel<'h> {
    Node(TypeId),
    Nonterminal(&'h Nonterminal),
    Variable(&'h str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ArcLabel<'h> {
    Selector(&'h SelectorLabel),
    Tentacle(usize),
    Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Element {
    Node(NodeId),
    Edge(EdgeId),
    Variable,
}

/// Arcs to one neighbour, sorted.
pub(crate) type Arcs<'h> = Vec<ArcLabel<'h>>;

#[derive(Debug)]
pub(crate) struct GraphData<'h> {
    pub labels: Vec<VertexLabel<'h>>,
    pub elements: Vec<Element>,
    pub succ: Vec<BTreeMap<usize, Arcs<'h>>>,
    pub pred: Vec<BTreeMap<usize, Arcs<'h>>>,
    /// External position of node vertices.
    pub external: Vec<Option<usize>>,
    pub node_count: usize,
}

impl<'h> GraphData<'h> {
    pub fn new(heap: &'h HeapConfiguration) -> Self {
        let mut data = GraphData {
            labels: Vec::new(),
            elements: Vec::new(),
            succ: Vec::new(),
            pred: Vec::new(),
            external: Vec::new(),
            node_count: heap.node_count(),
        };
        let mut vertex_of = BTreeMap::new();
        for node in heap.nodes() {
            let Some(ty) = heap.type_of(node) else { continue };
            vertex_of.insert(node, data.push(VertexLabel::Node(ty), Element::Node(node)));
            data.external.push(heap.external_index(node));
        }
        for (id, edge) in heap.nonterminal_edges() {
            let v = data.push(VertexLabel::Nonterminal(&edge.label), Element::Edge(id));
            data.external.push(None);
            for (i, tentacle) in edge.tentacles.iter().enumerate() {
                if let Some(&u) = vertex_of.get(tentacle) {
                    data.connect(v, u, ArcLabel::Tentacle(i));
                }
            }
        }
        for (name, node) in heap.variables() {
            let v = data.push(VertexLabel::Variable(name), Element::Variable);
            data.external.push(None);
            if let Some(&u) = vertex_of.get(&node) {
                data.connect(v, u, ArcLabel::Variable);
            }
        }
        for (from, label, to) in heap.selectors() {
            if let (Some(&v), Some(&u)) = (vertex_of.get(&from), vertex_of.get(&to)) {
                data.connect(v, u, ArcLabel::Selector(label));
            }
        }
        for arcs in data.succ.iter_mut().chain(data.pred.iter_mut()) {
            for labels in arcs.values_mut() {
                labels.sort();
            }
        }
        data
    }

    fn push(&mut self, label: VertexLabel<'h>, element: Element) -> usize {
        self.labels.push(label);
        self.elements.push(element);
        self.succ.push(BTreeMap::new());
        self.pred.push(BTreeMap::new());
        self.labels.len() - 1
    }

    fn connect(&mut self, from: usize, to: usize, label: ArcLabel<'h>) {
        self.succ[from].entry(to).or_default().push(label);
        self.pred[to].entry(from).or_default().push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_node(&self, v: usize) -> bool {
        matches!(self.elements[v], Element::Node(_))
    }

    pub fn is_external(&self, v: usize) -> bool {
        self.external[v].is_some()
    }

    /// Whether a node vertex originates at least one selector.
    pub fn has_selectors(&self, v: usize) -> bool {
        self.succ[v]
            .values()
            .any(|arcs| arcs.iter().any(|a| matches!(a, ArcLabel::Selector(_))))
    }

    /// Names of variables attached to a vertex.
    pub fn variables_at(&self, v: usize) -> impl Iterator<Item = &'h str> + '_ {
        self.pred[v].keys().filter_map(|&u| match self.labels[u] {
            VertexLabel::Variable(name) => Some(name),
            _ => None,
        })
    }

    /// Selector-hop distance of every vertex from the nearest node referenced
    /// by a variable (`usize::MAX` when unreachable). Constants only count
    /// when `include_constants` is set.
    pub fn variable_distances(&self, include_constants: bool) -> Vec<usize> {
        let mut dist = vec![usize::MAX; self.len()];
        let mut queue = VecDeque::new();
        for v in 0..self.len() {
            let referenced = self
                .variables_at(v)
                .any(|name| include_constants || !is_constant(name));
            if self.is_node(v) && referenced {
                dist[v] = 0;
                queue.push_back(v);
            }
        }
        while let Some(v) = queue.pop_front() {
            for (&u, arcs) in &self.succ[v] {
                let selector = arcs.iter().any(|a| matches!(a, ArcLabel::Selector(_)));
                if selector && dist[u] == usize::MAX {
                    dist[u] = dist[v] + 1;
                    queue.push_back(u);
                }
            }
        }
        dist
    }

    /// Vertex count per label, for quick impossibility checks.
    pub fn label_histogram(&self) -> BTreeMap<VertexLabel<'h>, usize> {
        let mut histogram = BTreeMap::new();
        for &label in &self.labels {
            *histogram.entry(label).or_insert(0) += 1;
        }
        histogram
    }
}
