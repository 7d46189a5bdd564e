//! The interface between program statements and the generator.

use heapgram_grammar::ViolationPoints;

use crate::error::{GenerationError, SemanticsError};
use crate::state::ProgramState;

/// Abstract semantics of one program statement.
pub trait Semantics {
    /// Execute the statement on a sufficiently materialized state.
    ///
    /// Every successor carries the program counter it continues at.
    fn compute_successors(&self, state: &ProgramState) -> Result<Vec<ProgramState>, SemanticsError>;

    /// Selector accesses that must be concrete before execution.
    fn potential_violation_points(&self) -> ViolationPoints;

    /// Program counters this statement may continue at.
    fn successor_pcs(&self) -> Vec<usize>;

    fn needs_materialization(&self, state: &ProgramState) -> bool {
        self.potential_violation_points()
            .unsatisfied_in(&state.heap)
            .next()
            .is_some()
    }

    /// Whether states reaching this statement may be abstracted.
    fn permits_canonicalization(&self) -> bool {
        true
    }

    /// A statement without successor locations ends the program.
    fn is_terminal(&self) -> bool {
        self.successor_pcs().is_empty()
    }
}

/// A program: statements addressed by their index.
#[derive(Debug, Clone)]
pub struct Program<S> {
    statements: Vec<S>,
}

impl<S: Semantics> Program<S> {
    /// Check that every successor location exists.
    pub fn new(statements: Vec<S>) -> Result<Self, GenerationError> {
        let len = statements.len();
        if let Some(pc) = statements
            .iter()
            .flat_map(|statement| statement.successor_pcs())
            .find(|&pc| pc >= len)
        {
            return Err(GenerationError::InvalidPc(pc));
        }
        Ok(Self { statements })
    }

    pub fn statement(&self, pc: usize) -> Result<&S, GenerationError> {
        self.statements.get(pc).ok_or(GenerationError::InvalidPc(pc))
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
