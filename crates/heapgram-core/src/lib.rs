//! Core data model for heapgram.
//!
//! Heap configurations are hypergraphs: typed nodes, selector edges,
//! nonterminal hyperedges, variable edges and an ordered external interface.
//! Types and nonterminals are interned in a [`Session`] owned by the analysis.

pub mod builder;
pub mod hash;
pub mod heap;
pub mod matching;
pub mod nonterminal;
pub mod session;

pub use builder::{HeapBuilder, Splice};
pub use hash::{hash_hex, structural_hash, ContentHash};
pub use heap::edge::{EdgeId, NonterminalEdge};
pub use heap::node::{Node, NodeId, SelectorLabel};
pub use heap::{GraphError, HeapConfiguration};
pub use matching::Matching;
pub use nonterminal::{BasicNonterminal, Nonterminal};
pub use session::{is_constant, NodeType, Session, TypeId};
