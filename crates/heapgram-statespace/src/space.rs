//! The abstract transition system built by the generator.

use std::collections::{BTreeSet, HashMap};

use heapgram_core::{hash_hex, structural_hash, ContentHash};
use log::trace;

use crate::error::GenerationError;
use crate::state::{ProgramState, StateId};

/// States addressed by [`StateId`] with control-flow and materialization
/// transitions between them.
///
/// States are bucketed by program counter and structural hash, so looking up
/// an equivalent state runs the isomorphism check only against candidates
/// that already agree on both. Inserted states are never mutated.
#[derive(Debug, Clone, Default)]
pub struct StateSpace {
    states: Vec<ProgramState>,
    control_flow: Vec<BTreeSet<StateId>>,
    materialization: Vec<BTreeSet<StateId>>,
    initial: BTreeSet<StateId>,
    finals: BTreeSet<StateId>,
    index: HashMap<(usize, ContentHash), Vec<StateId>>,
    max_state_size: usize,
}

impl StateSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &ProgramState)> + '_ {
        (0..).map(StateId).zip(&self.states)
    }

    pub fn state(&self, id: StateId) -> Option<&ProgramState> {
        self.states.get(id.index())
    }

    /// States at one program location.
    pub fn states_at(&self, pc: usize) -> impl Iterator<Item = (StateId, &ProgramState)> + '_ {
        self.states().filter(move |(_, state)| state.pc == pc)
    }

    pub fn initial_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.initial.iter().copied()
    }

    pub fn final_states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.finals.iter().copied()
    }

    pub fn is_final(&self, id: StateId) -> bool {
        self.finals.contains(&id)
    }

    pub fn control_flow_successors_of(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.control_flow
            .get(id.index())
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    pub fn materialization_successors_of(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.materialization
            .get(id.index())
            .into_iter()
            .flat_map(|targets| targets.iter().copied())
    }

    /// Number of control-flow and materialization transitions.
    pub fn transition_count(&self) -> usize {
        self.control_flow
            .iter()
            .chain(&self.materialization)
            .map(BTreeSet::len)
            .sum()
    }

    /// Largest heap size among all states.
    pub fn max_state_size(&self) -> usize {
        self.max_state_size
    }

    /// An existing state equivalent to `state`.
    pub fn find(&self, state: &ProgramState) -> Option<StateId> {
        let key = (state.pc, structural_hash(&state.heap));
        self.find_in_bucket(&key, state)
    }

    fn find_in_bucket(&self, key: &(usize, ContentHash), state: &ProgramState) -> Option<StateId> {
        self.index.get(key)?.iter().copied().find(|&id| {
            self.states[id.index()].is_equivalent(state)
        })
    }

    /// Insert without looking for an equivalent state.
    ///
    /// Fails only once every [`StateId`] is taken.
    pub fn add_state(&mut self, state: ProgramState) -> Result<StateId, GenerationError> {
        let key = (state.pc, structural_hash(&state.heap));
        self.insert(key, state)
    }

    /// Insert unless an equivalent state exists; returns the state's id and
    /// whether it is new.
    pub fn add_state_if_absent(
        &mut self,
        state: ProgramState,
    ) -> Result<(StateId, bool), GenerationError> {
        let key = (state.pc, structural_hash(&state.heap));
        match self.find_in_bucket(&key, &state) {
            Some(existing) => Ok((existing, false)),
            None => Ok((self.insert(key, state)?, true)),
        }
    }

    fn insert(
        &mut self,
        key: (usize, ContentHash),
        state: ProgramState,
    ) -> Result<StateId, GenerationError> {
        let id = StateId::from_index(self.states.len())
            .ok_or(GenerationError::TooManyStates(self.states.len()))?;
        trace!("{id} at pc {} with hash {}", key.0, hash_hex(&key.1));
        self.max_state_size = self.max_state_size.max(state.heap.size());
        self.states.push(state);
        self.control_flow.push(BTreeSet::new());
        self.materialization.push(BTreeSet::new());
        self.index.entry(key).or_default().push(id);
        Ok(id)
    }

    pub fn mark_initial(&mut self, id: StateId) {
        self.initial.insert(id);
    }

    pub fn mark_final(&mut self, id: StateId) {
        self.finals.insert(id);
    }

    pub fn add_control_flow_transition(&mut self, from: StateId, to: StateId) {
        if let Some(targets) = self.control_flow.get_mut(from.index()) {
            targets.insert(to);
        }
    }

    pub fn add_materialization_transition(&mut self, from: StateId, to: StateId) {
        if let Some(targets) = self.materialization.get_mut(from.index()) {
            targets.insert(to);
        }
    }
}
