//! Abstract state-space generation for heap-manipulating programs.
//!
//! A [`Program`] is a sequence of statements implementing [`Semantics`].
//! [`StateSpaceGenerator`] explores it over a grammar: states are
//! materialized before their statement dereferences abstract structure,
//! executed, canonicalized, and merged into a [`StateSpace`].

pub mod config;
pub mod error;
pub mod generator;
pub mod semantics;
pub mod space;
pub mod state;
pub mod statements;

#[cfg(test)]
mod testing;

pub use config::{ExplorationOrder, GeneratorConfig};
pub use error::{ConfigError, GenerationError, SemanticsError};
pub use generator::{
    AbortReason, Generation, GenerationOutcome, GenerationStats, StateSpaceGenerator,
};
pub use semantics::{Program, Semantics};
pub use space::StateSpace;
pub use state::{ProgramState, StateId};
pub use statements::{Statement, NULL};
