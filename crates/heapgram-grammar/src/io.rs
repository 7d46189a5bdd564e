//! JSON input for heap configurations and grammars.
//!
//! A heap is an object with `nodes` (groups of `number` nodes of one `type`),
//! `externals`, `variables`, `selectors` and `hyperedges`; every reference is
//! the position of a node in the order the groups create them. A grammar is
//! an array of fragments, each naming a `nonterminal` with its `rank`,
//! optional `reductionTentacles` and the right-hand sides in `rules`.
//!
//! ```json
//! [{
//!   "nonterminal": "SLL", "rank": 2, "reductionTentacles": [false, true],
//!   "rules": [{
//!     "nodes": [{ "type": "List", "number": 2 }],
//!     "externals": [0, 1],
//!     "selectors": [{ "label": "next", "origin": 0, "target": 1 }]
//!   }]
//! }]
//! ```

use heapgram_core::{HeapBuilder, HeapConfiguration, NodeId, SelectorLabel, Session};
use serde::Deserialize;

use crate::error::GrammarError;
use crate::grammar::Grammar;

#[derive(Debug, Deserialize)]
struct HeapDocument {
    #[serde(default)]
    nodes: Vec<NodeGroup>,
    #[serde(default)]
    externals: Vec<usize>,
    #[serde(default)]
    variables: Vec<VariableEntry>,
    #[serde(default)]
    selectors: Vec<SelectorEntry>,
    #[serde(default)]
    hyperedges: Vec<HyperedgeEntry>,
}

#[derive(Debug, Deserialize)]
struct NodeGroup {
    #[serde(rename = "type")]
    ty: String,
    number: usize,
}

#[derive(Debug, Deserialize)]
struct VariableEntry {
    name: String,
    target: usize,
}

#[derive(Debug, Deserialize)]
struct SelectorEntry {
    label: String,
    origin: usize,
    target: usize,
    #[serde(default)]
    annotation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HyperedgeEntry {
    label: String,
    tentacles: Vec<usize>,
    #[serde(default)]
    index: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrammarFragment {
    nonterminal: String,
    rank: usize,
    #[serde(default)]
    reduction_tentacles: Option<Vec<bool>>,
    rules: Vec<HeapDocument>,
}

/// Parse a heap configuration, interning its types in `session`.
///
/// Hyperedge labels must name nonterminals already known to the session.
pub fn parse_heap(session: &mut Session, input: &str) -> Result<HeapConfiguration, GrammarError> {
    let document: HeapDocument = serde_json::from_str(input)?;
    build_heap(session, document)
}

/// Parse a grammar, interning its nonterminals and types in `session`.
///
/// All fragments are declared before any rule is read, so rules may refer to
/// nonterminals defined later in the array. Fragments without
/// `reductionTentacles` get no reduction tentacles.
pub fn parse_grammar(session: &mut Session, input: &str) -> Result<Grammar, GrammarError> {
    let fragments: Vec<GrammarFragment> = serde_json::from_str(input)?;

    let mut declared = Vec::with_capacity(fragments.len());
    for fragment in &fragments {
        let flags = match &fragment.reduction_tentacles {
            Some(flags) if flags.len() != fragment.rank => {
                return Err(GrammarError::InvalidInput {
                    reason: format!(
                        "{} has rank {} but {} reduction flags",
                        fragment.nonterminal,
                        fragment.rank,
                        flags.len()
                    ),
                });
            }
            Some(flags) => flags.clone(),
            None => vec![false; fragment.rank],
        };
        declared.push(session.nonterminal(&fragment.nonterminal, &flags)?);
    }

    let mut builder = Grammar::builder();
    for (lhs, fragment) in declared.into_iter().zip(fragments) {
        for rule in fragment.rules {
            let rhs = build_heap(session, rule)?;
            builder.add_rule(lhs.clone(), rhs)?;
        }
    }
    Ok(builder.build())
}

fn build_heap(session: &mut Session, document: HeapDocument) -> Result<HeapConfiguration, GrammarError> {
    let mut builder = HeapBuilder::new();
    let mut nodes = Vec::new();
    for group in &document.nodes {
        let ty = session.node_type(&group.ty);
        nodes.extend(builder.add_nodes(ty, group.number));
    }
    let node = |position: usize| -> Result<NodeId, GrammarError> {
        nodes
            .get(position)
            .copied()
            .ok_or_else(|| GrammarError::InvalidInput {
                reason: format!("node {position} out of range ({} nodes)", nodes.len()),
            })
    };

    for &position in &document.externals {
        builder.set_external(node(position)?)?;
    }
    for variable in &document.variables {
        builder.add_variable(&variable.name, node(variable.target)?)?;
    }
    for selector in document.selectors {
        let label = match selector.annotation {
            Some(annotation) => SelectorLabel::annotated(selector.label, annotation),
            None => SelectorLabel::new(selector.label),
        };
        builder.add_selector(node(selector.origin)?, label, node(selector.target)?)?;
    }
    for edge in document.hyperedges {
        let base = session
            .lookup_nonterminal(&edge.label)
            .ok_or_else(|| GrammarError::UnknownNonterminal(edge.label.clone()))?;
        let label = match edge.index {
            Some(index) => base.with_index(index),
            None => base,
        };
        let tentacles = edge
            .tentacles
            .iter()
            .map(|&position| node(position))
            .collect::<Result<Vec<_>, _>>()?;
        builder.add_nonterminal_edge(label, tentacles)?;
    }

    let heap = builder.build();
    session.check_selectors(&heap)?;
    Ok(heap)
}
