//! Error types for program semantics, configuration and state-space
//! generation.

use std::path::PathBuf;

use heapgram_core::GraphError;
use heapgram_grammar::GrammarError;

/// Errors raised while executing one statement on an abstract heap.
#[derive(Debug, thiserror::Error)]
pub enum SemanticsError {
    /// The heap does not bind a constant the statement relies on.
    #[error("constant '{name}' is not bound in the heap")]
    MissingConstant { name: String },

    /// The heap rejected an update.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors reading, writing or checking a [`GeneratorConfig`](crate::GeneratorConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed generator configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot render generator configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("no generator configuration at {}", path.display())]
    Missing { path: PathBuf },

    #[error("cannot read generator configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two settings that cannot be combined.
    #[error("`{setting}` requires {requirement}")]
    Unsupported {
        setting: &'static str,
        requirement: &'static str,
    },
}

/// Errors that stop state-space generation.
///
/// Running out of budget is not an error; see
/// [`GenerationOutcome`](crate::generator::GenerationOutcome).
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("statement {pc}: {source}")]
    Semantics {
        pc: usize,
        #[source]
        source: SemanticsError,
    },

    /// A state or statement refers to a program counter outside the program.
    #[error("program counter {0} is out of range")]
    InvalidPc(usize),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every state id is in use.
    #[error("state space is full at {0} states")]
    TooManyStates(usize),
}
