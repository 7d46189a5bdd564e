//! Program states: a program counter paired with an abstract heap.

use std::fmt;

use heapgram_core::HeapConfiguration;
use heapgram_match::is_isomorphic;

/// Stable identifier of a state within one state space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub u32);

impl StateId {
    /// The id of the state stored at `index`, if it fits in 32 bits.
    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(StateId)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// A heap at a program location.
#[derive(Debug, Clone)]
pub struct ProgramState {
    pub pc: usize,
    pub heap: HeapConfiguration,
}

impl ProgramState {
    pub fn new(pc: usize, heap: HeapConfiguration) -> Self {
        Self { pc, heap }
    }

    /// The same heap at another location.
    pub fn at(&self, pc: usize) -> Self {
        Self {
            pc,
            heap: self.heap.clone(),
        }
    }

    /// Same location and isomorphic heaps.
    pub fn is_equivalent(&self, other: &ProgramState) -> bool {
        self.pc == other.pc && is_isomorphic(&self.heap, &other.heap)
    }
}
