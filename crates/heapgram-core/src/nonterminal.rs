//! Nonterminal labels for hyperedges.
//!
//! Plain, automaton-refined and indexed nonterminals share one tagged type so
//! that matching and grammar lookups never need to know which flavour they are
//! looking at.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A plain nonterminal: label plus per-tentacle reduction flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasicNonterminal {
    label: String,
    reduction_tentacles: Vec<bool>,
}

impl BasicNonterminal {
    pub(crate) fn new(label: &str, reduction_tentacles: Vec<bool>) -> Self {
        Self {
            label: label.to_string(),
            reduction_tentacles,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn rank(&self) -> usize {
        self.reduction_tentacles.len()
    }

    pub fn reduction_tentacles(&self) -> &[bool] {
        &self.reduction_tentacles
    }
}

/// Label of a nonterminal hyperedge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Nonterminal {
    Basic(BasicNonterminal),
    /// A nonterminal annotated with the state of a heap automaton.
    Refined {
        base: BasicNonterminal,
        state: String,
    },
    /// A nonterminal carrying an index stack (counted abstractions).
    Indexed {
        base: BasicNonterminal,
        index: Vec<String>,
    },
}

impl Nonterminal {
    /// The underlying plain nonterminal.
    pub fn base(&self) -> &BasicNonterminal {
        match self {
            Nonterminal::Basic(base)
            | Nonterminal::Refined { base, .. }
            | Nonterminal::Indexed { base, .. } => base,
        }
    }

    pub fn rank(&self) -> usize {
        self.base().rank()
    }

    pub fn label(&self) -> &str {
        self.base().label()
    }

    /// Whether tentacle `i` is a reduction tentacle. Out-of-range indices are not.
    pub fn is_reduction_tentacle(&self, i: usize) -> bool {
        self.base()
            .reduction_tentacles()
            .get(i)
            .copied()
            .unwrap_or(false)
    }

    /// The same base nonterminal refined with an automaton state.
    pub fn refine(&self, state: impl Into<String>) -> Nonterminal {
        Nonterminal::Refined {
            base: self.base().clone(),
            state: state.into(),
        }
    }

    /// The same base nonterminal carrying an index stack.
    pub fn with_index(&self, index: Vec<String>) -> Nonterminal {
        Nonterminal::Indexed {
            base: self.base().clone(),
            index,
        }
    }
}

impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nonterminal::Basic(base) => write!(f, "{}", base.label()),
            Nonterminal::Refined { base, state } => write!(f, "{}[{}]", base.label(), state),
            Nonterminal::Indexed { base, index } => {
                write!(f, "{}<{}>", base.label(), index.join(","))
            }
        }
    }
}
