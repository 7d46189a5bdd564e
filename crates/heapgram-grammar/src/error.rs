//! Grammar errors.

use heapgram_core::GraphError;
use thiserror::Error;

/// Errors raised while building grammars or applying their rules.
#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("right-hand side of {label} has {found} external nodes, expected {expected}")]
    RankMismatch {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("rule for {label} does not shrink the structure it folds")]
    NonReducingRule { label: String },

    #[error("unknown nonterminal: {0}")]
    UnknownNonterminal(String),

    #[error("malformed input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },
}
