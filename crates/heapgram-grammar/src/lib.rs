//! Grammar-driven abstraction for heapgram.
//!
//! A [`Grammar`] describes how nonterminal edges unfold into concrete
//! structure. [`Materializer`] unfolds edges where a program is about to
//! dereference a selector; [`CanonicalizationStrategy`] folds structure back
//! until no rule applies; [`MinDistanceInclusion`] decides subsumption
//! between abstract heaps.

pub mod canonicalize;
pub mod error;
pub mod grammar;
pub mod inclusion;
pub mod io;
pub mod materialize;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use canonicalize::{AbstractionMode, CanonicalizationStats, CanonicalizationStrategy};
pub use error::GrammarError;
pub use grammar::{CollapsedRule, Grammar, GrammarBuilder};
pub use inclusion::{InclusionStrategy, MinDistanceInclusion};
pub use io::{parse_grammar, parse_heap};
pub use materialize::{Materialized, Materializer, ViolationPoints};
