//! Worklist exploration of a program's abstract state space.
//!
//! Each popped state is first materialized at the violation points of its
//! statement. Materialized alternatives go straight back into the worklist;
//! a sufficiently concrete state is executed instead, and its successors are
//! canonicalized (when the successor's statement permits it) and merged with
//! equivalent or subsuming states before they are added.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use heapgram_core::HeapConfiguration;
use heapgram_grammar::{
    AbstractionMode, CanonicalizationStrategy, Grammar, InclusionStrategy, Materializer,
    MinDistanceInclusion,
};
use heapgram_match::is_isomorphic;
use log::{debug, info, trace, warn};

use crate::config::{ExplorationOrder, GeneratorConfig};
use crate::error::GenerationError;
use crate::semantics::{Program, Semantics};
use crate::space::StateSpace;
use crate::state::{ProgramState, StateId};

/// Why a generation stopped before exploring every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    StateLimit { limit: usize },
    StateSizeLimit { limit: usize },
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::StateLimit { limit } => write!(f, "more than {limit} states"),
            AbortReason::StateSizeLimit { limit } => write!(f, "a state larger than {limit}"),
            AbortReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The worklist ran empty.
    Complete,
    /// Exploration stopped early; the state space is partial.
    Truncated {
        reason: AbortReason,
        states_explored: usize,
    },
}

/// Counters collected during one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub states: usize,
    /// Successors that matched an existing state.
    pub merges: usize,
    /// Successors discarded because a known state includes them.
    pub subsumed: usize,
    /// States that had to be materialized.
    pub materializations: usize,
    /// Rule applications during canonicalization.
    pub folds: usize,
    pub max_state_size: usize,
}

/// Everything one generation produced.
#[derive(Debug)]
pub struct Generation {
    pub space: StateSpace,
    pub outcome: GenerationOutcome,
    pub stats: GenerationStats,
    /// Aggressively abstracted heaps of the final states, without duplicates.
    pub final_summary: Vec<HeapConfiguration>,
}

impl Generation {
    pub fn is_complete(&self) -> bool {
        self.outcome == GenerationOutcome::Complete
    }
}

/// Explores the abstract state space of a program over one grammar.
pub struct StateSpaceGenerator<'a, S> {
    program: &'a Program<S>,
    config: GeneratorConfig,
    materializer: Materializer<'a>,
    canonicalizer: CanonicalizationStrategy<'a>,
    inclusion: Option<Box<dyn InclusionStrategy + 'a>>,
    cancelled: Arc<AtomicBool>,
}

impl<'a, S: Semantics> StateSpaceGenerator<'a, S> {
    /// Set up a generator; subsumption uses [`MinDistanceInclusion`] unless
    /// another strategy is installed with [`Self::with_inclusion`].
    pub fn new(
        program: &'a Program<S>,
        grammar: &'a Grammar,
        config: GeneratorConfig,
    ) -> Result<Self, GenerationError> {
        config.validate()?;
        let canonicalizer = CanonicalizationStrategy::new(grammar, config.abstraction_distance)
            .protect_constants(config.protect_constants);
        let inclusion: Option<Box<dyn InclusionStrategy + 'a>> = if config.subsumption {
            Some(Box::new(MinDistanceInclusion::new(grammar)))
        } else {
            None
        };
        Ok(Self {
            program,
            config,
            materializer: Materializer::new(grammar),
            canonicalizer,
            inclusion,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn with_inclusion(mut self, inclusion: Box<dyn InclusionStrategy + 'a>) -> Self {
        self.inclusion = Some(inclusion);
        self
    }

    /// Share a cancellation flag, checked once per worklist pop.
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Handle that stops a running generation when set.
    pub fn cancellation(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Explore from the given initial states.
    ///
    /// Initial states are canonicalized like successors and merged when
    /// equivalent.
    pub fn generate(
        &self,
        initial: impl IntoIterator<Item = ProgramState>,
    ) -> Result<Generation, GenerationError> {
        let mut space = StateSpace::new();
        let mut stats = GenerationStats::default();
        let mut worklist = VecDeque::new();

        for state in initial {
            let state = self.canonicalization_phase(state, &mut stats)?;
            let (id, added) = space.add_state_if_absent(state)?;
            space.mark_initial(id);
            if added {
                worklist.push_back(id);
            }
        }
        info!(
            "generating state space: {} initial states, {} statements",
            worklist.len(),
            self.program.len()
        );

        let mut explored = 0;
        let mut outcome = GenerationOutcome::Complete;
        while let Some(id) = self.next_state(&mut worklist) {
            if let Some(reason) = self.check_abort(&space) {
                warn!("state space generation stopped after {explored} states: {reason}");
                outcome = GenerationOutcome::Truncated {
                    reason,
                    states_explored: explored,
                };
                break;
            }
            explored += 1;

            let Some(state) = space.state(id).cloned() else {
                continue;
            };
            let statement = self.program.statement(state.pc)?;

            if self.materialization_phase(statement, id, &state, &mut space, &mut worklist, &mut stats)? {
                continue;
            }

            let successors = statement
                .compute_successors(&state)
                .map_err(|source| GenerationError::Semantics {
                    pc: state.pc,
                    source,
                })?;
            if successors.is_empty() {
                if statement.is_terminal() {
                    space.mark_final(id);
                } else {
                    debug!("{id} at {} has no successors", state.pc);
                }
                continue;
            }

            for successor in successors {
                let successor = self.canonicalization_phase(successor, &mut stats)?;
                self.adding_phase(id, successor, &mut space, &mut worklist, &mut stats)?;
            }
        }

        stats.states = space.len();
        stats.max_state_size = space.max_state_size();
        let final_summary = if self.config.summarize_final_states {
            self.summarize(&space)?
        } else {
            Vec::new()
        };
        info!(
            "state space: {} states, {} final, {} merges, {} subsumed, {} materializations",
            stats.states,
            space.final_states().count(),
            stats.merges,
            stats.subsumed,
            stats.materializations
        );

        Ok(Generation {
            space,
            outcome,
            stats,
            final_summary,
        })
    }

    fn next_state(&self, worklist: &mut VecDeque<StateId>) -> Option<StateId> {
        match self.config.exploration {
            ExplorationOrder::BreadthFirst => worklist.pop_front(),
            ExplorationOrder::DepthFirst => worklist.pop_back(),
        }
    }

    fn check_abort(&self, space: &StateSpace) -> Option<AbortReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(AbortReason::Cancelled);
        }
        let limit = self.config.max_states;
        if limit > 0 && space.len() > limit {
            return Some(AbortReason::StateLimit { limit });
        }
        let limit = self.config.max_state_size;
        if limit > 0 && space.max_state_size() > limit {
            return Some(AbortReason::StateSizeLimit { limit });
        }
        None
    }

    /// Returns true if `state` was replaced by materialized states.
    ///
    /// Materialized states are added without looking for equivalent ones;
    /// they are as concrete as their statement needs and rarely coincide.
    fn materialization_phase(
        &self,
        statement: &S,
        id: StateId,
        state: &ProgramState,
        space: &mut StateSpace,
        worklist: &mut VecDeque<StateId>,
        stats: &mut GenerationStats,
    ) -> Result<bool, GenerationError> {
        if !statement.needs_materialization(state) {
            return Ok(false);
        }
        let materialized = self
            .materializer
            .materialize(&state.heap, &statement.potential_violation_points())?;
        if materialized.is_unchanged() {
            trace!("{id}: violation points cannot be resolved");
            return Ok(false);
        }

        stats.materializations += 1;
        debug!(
            "{id} materialized into {} states ({} unfoldings)",
            materialized.heaps.len(),
            materialized.unfoldings
        );
        for heap in materialized.heaps {
            let next = space.add_state(ProgramState::new(state.pc, heap))?;
            space.add_materialization_transition(id, next);
            worklist.push_back(next);
        }
        Ok(true)
    }

    fn canonicalization_phase(
        &self,
        state: ProgramState,
        stats: &mut GenerationStats,
    ) -> Result<ProgramState, GenerationError> {
        if !self.config.canonicalize || !self.program.statement(state.pc)?.permits_canonicalization() {
            return Ok(state);
        }
        let (heap, folding) = self
            .canonicalizer
            .canonicalize(state.heap, AbstractionMode::Lenient)?;
        stats.folds += folding.total_folds();
        Ok(ProgramState::new(state.pc, heap))
    }

    fn adding_phase(
        &self,
        from: StateId,
        state: ProgramState,
        space: &mut StateSpace,
        worklist: &mut VecDeque<StateId>,
        stats: &mut GenerationStats,
    ) -> Result<(), GenerationError> {
        if let Some(existing) = space.find(&state) {
            stats.merges += 1;
            space.add_control_flow_transition(from, existing);
            return Ok(());
        }
        if let Some(inclusion) = &self.inclusion {
            let subsuming = space
                .states_at(state.pc)
                .find(|(_, known)| inclusion.is_included_in(&state.heap, &known.heap))
                .map(|(id, _)| id);
            if let Some(subsuming) = subsuming {
                trace!("{from}: successor subsumed by {subsuming}");
                stats.subsumed += 1;
                space.add_control_flow_transition(from, subsuming);
                return Ok(());
            }
        }
        let id = space.add_state(state)?;
        space.add_control_flow_transition(from, id);
        worklist.push_back(id);
        Ok(())
    }

    fn summarize(&self, space: &StateSpace) -> Result<Vec<HeapConfiguration>, GenerationError> {
        let mut summary: Vec<HeapConfiguration> = Vec::new();
        for id in space.final_states() {
            let Some(state) = space.state(id) else {
                continue;
            };
            let (heap, _) = self
                .canonicalizer
                .canonicalize(state.heap.clone(), AbstractionMode::Aggressive)?;
            if !summary.iter().any(|known| is_isomorphic(known, &heap)) {
                summary.push(heap);
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SemanticsError;
    use crate::statements::Statement;
    use crate::testing::{construction, empty_heap, lists, null_terminated, traversal, Lists};
    use heapgram_core::HeapBuilder;
    use heapgram_grammar::ViolationPoints;
    use test_log::test;

    fn traverse(len: usize, config: GeneratorConfig) -> Generation {
        let lists = lists();
        let program = traversal();
        let generator = StateSpaceGenerator::new(&program, &lists.grammar, config).unwrap();
        generator
            .generate([ProgramState::new(0, null_terminated(&lists, len))])
            .unwrap()
    }

    #[test]
    fn traversal_state_count_is_independent_of_list_length() {
        let counts: Vec<usize> = [3, 10, 100]
            .into_iter()
            .map(|len| {
                let generation = traverse(len, GeneratorConfig::default());
                assert!(generation.is_complete());
                generation.space.len()
            })
            .collect();
        assert_eq!(counts[0], counts[1]);
        assert_eq!(counts[1], counts[2]);
    }

    #[test]
    fn traversal_materializes_and_terminates() {
        let generation = traverse(5, GeneratorConfig::default());
        let space = &generation.space;

        assert!(generation.stats.materializations > 0);
        assert!(generation.stats.merges > 0);
        assert_eq!(space.initial_states().count(), 1);
        let finals: Vec<_> = space.final_states().collect();
        assert_eq!(finals.len(), 1);
        let last = space.state(finals[0]).unwrap();
        assert_eq!(last.pc, 4);
        assert_eq!(last.heap.variable_target("cur"), last.heap.variable_target("null"));

        let materialized = space
            .states()
            .map(|(id, _)| space.materialization_successors_of(id).count())
            .find(|&count| count > 0);
        assert_eq!(materialized, Some(2));

        // one segment from head to null
        assert_eq!(generation.final_summary.len(), 1);
        let summary = &generation.final_summary[0];
        assert_eq!(summary.node_count(), 2);
        assert_eq!(summary.edge_count(), 1);
        assert_eq!(summary.selector_count(), 0);
    }

    #[test]
    fn concrete_exploration_grows_with_the_list() {
        let config = GeneratorConfig {
            canonicalize: false,
            ..GeneratorConfig::default()
        };
        let short = traverse(3, config.clone());
        let long = traverse(6, config);
        assert!(short.is_complete() && long.is_complete());
        assert!(long.space.len() > short.space.len());
        assert_eq!(short.stats.folds, 0);
        assert_eq!(short.stats.materializations, 0);
    }

    #[test]
    fn construction_loop_reaches_a_fixpoint() {
        let lists = lists();
        let program = construction(&lists);
        let explore = |exploration| {
            let config = GeneratorConfig {
                exploration,
                ..GeneratorConfig::default()
            };
            StateSpaceGenerator::new(&program, &lists.grammar, config)
                .unwrap()
                .generate([ProgramState::new(0, empty_heap(&lists))])
                .unwrap()
        };

        let bfs = explore(ExplorationOrder::BreadthFirst);
        let dfs = explore(ExplorationOrder::DepthFirst);
        assert!(bfs.is_complete() && dfs.is_complete());
        // empty, one element, and an abstract segment behind the head
        assert_eq!(bfs.space.final_states().count(), 3);
        assert_eq!(bfs.space.len(), dfs.space.len());
        assert!(bfs
            .space
            .final_states()
            .all(|id| bfs.space.state(id).unwrap().pc == 6));
        assert!(bfs.final_summary.len() <= 3);
    }

    #[test]
    fn state_limit_truncates() {
        let config = GeneratorConfig {
            max_states: 3,
            ..GeneratorConfig::default()
        };
        let generation = traverse(5, config);
        assert!(matches!(
            generation.outcome,
            GenerationOutcome::Truncated {
                reason: AbortReason::StateLimit { limit: 3 },
                ..
            }
        ));
        assert!(generation.space.len() > 3);
    }

    #[test]
    fn state_size_limit_truncates() {
        let config = GeneratorConfig {
            canonicalize: false,
            max_state_size: 5,
            ..GeneratorConfig::default()
        };
        let generation = traverse(8, config);
        assert_eq!(
            generation.outcome,
            GenerationOutcome::Truncated {
                reason: AbortReason::StateSizeLimit { limit: 5 },
                states_explored: 0,
            }
        );
    }

    #[test]
    fn cancellation_stops_before_exploring() {
        let lists = lists();
        let program = traversal();
        let generator =
            StateSpaceGenerator::new(&program, &lists.grammar, GeneratorConfig::default()).unwrap();
        generator.cancellation().store(true, Ordering::Relaxed);

        let generation = generator
            .generate([ProgramState::new(0, null_terminated(&lists, 4))])
            .unwrap();
        assert_eq!(
            generation.outcome,
            GenerationOutcome::Truncated {
                reason: AbortReason::Cancelled,
                states_explored: 0,
            }
        );
        assert_eq!(generation.space.len(), 1);
    }

    #[test]
    fn subsumption_never_adds_states() {
        let plain = traverse(5, GeneratorConfig::default());
        let config = GeneratorConfig {
            subsumption: true,
            ..GeneratorConfig::default()
        };
        let subsumed = traverse(5, config);
        assert!(subsumed.is_complete());
        assert!(subsumed.space.len() <= plain.space.len());
        assert_eq!(subsumed.space.final_states().count(), 1);
    }

    /// `x` and `y` joined by a `next` selector, or by an abstract segment.
    fn segment(lists: &Lists, abstracted: bool) -> HeapConfiguration {
        let mut builder = HeapBuilder::new();
        let n = builder.add_nodes(lists.list, 2);
        if abstracted {
            builder
                .add_nonterminal_edge(lists.sll.clone(), vec![n[0], n[1]])
                .unwrap();
        } else {
            builder.add_selector(n[0], "next", n[1]).unwrap();
        }
        builder.add_variable("x", n[0]).unwrap();
        builder.add_variable("y", n[1]).unwrap();
        builder.build()
    }

    #[test]
    fn subsumption_discards_included_successors() {
        let lists = lists();
        let program = Program::new(vec![Statement::Goto(1), Statement::Return]).unwrap();
        let initial = || {
            [
                ProgramState::new(0, segment(&lists, true)),
                ProgramState::new(0, segment(&lists, false)),
            ]
        };

        let plain = StateSpaceGenerator::new(&program, &lists.grammar, GeneratorConfig::default())
            .unwrap()
            .generate(initial())
            .unwrap();
        assert_eq!(plain.space.len(), 4);
        assert_eq!(plain.stats.subsumed, 0);
        assert_eq!(plain.space.states_at(1).count(), 2);

        let config = GeneratorConfig {
            subsumption: true,
            ..GeneratorConfig::default()
        };
        let generation = StateSpaceGenerator::new(&program, &lists.grammar, config)
            .unwrap()
            .generate(initial())
            .unwrap();
        assert!(generation.is_complete());
        assert_eq!(generation.stats.subsumed, 1);
        assert_eq!(generation.space.len(), 3);

        // the concrete successor was redirected to the abstract state at pc 1
        let at_exit: Vec<_> = generation.space.states_at(1).collect();
        assert_eq!(at_exit.len(), 1);
        let (abstract_exit, state) = at_exit[0];
        assert_eq!(state.heap.edge_count(), 1);
        assert_eq!(state.heap.selector_count(), 0);
        let concrete = generation
            .space
            .states_at(0)
            .find(|(_, state)| state.heap.selector_count() == 1)
            .map(|(id, _)| id)
            .unwrap();
        assert_eq!(
            generation.space.control_flow_successors_of(concrete).collect::<Vec<_>>(),
            vec![abstract_exit]
        );
        assert_eq!(generation.space.final_states().collect::<Vec<_>>(), vec![abstract_exit]);
    }

    /// Executes like the wrapped statement but never allows abstraction.
    struct Concrete(Statement);

    impl Semantics for Concrete {
        fn compute_successors(&self, state: &ProgramState) -> Result<Vec<ProgramState>, SemanticsError> {
            self.0.compute_successors(state)
        }

        fn potential_violation_points(&self) -> ViolationPoints {
            self.0.potential_violation_points()
        }

        fn successor_pcs(&self) -> Vec<usize> {
            self.0.successor_pcs()
        }

        fn permits_canonicalization(&self) -> bool {
            false
        }
    }

    #[test]
    fn statements_can_forbid_canonicalization() {
        let lists = lists();
        let program = Program::new(vec![
            Concrete(Statement::Assign {
                lhs: "cur".into(),
                rhs: "head".into(),
                next: 1,
            }),
            Concrete(Statement::Return),
        ])
        .unwrap();
        let generator =
            StateSpaceGenerator::new(&program, &lists.grammar, GeneratorConfig::default()).unwrap();
        let generation = generator
            .generate([ProgramState::new(0, null_terminated(&lists, 4))])
            .unwrap();

        assert_eq!(generation.stats.folds, 0);
        let last = generation.space.final_states().next().unwrap();
        assert_eq!(generation.space.state(last).unwrap().heap.node_count(), 5);
        // the summary still abstracts
        assert_eq!(generation.final_summary[0].node_count(), 2);
    }

    #[test]
    fn rejects_inconsistent_config() {
        let lists = lists();
        let program = traversal();
        let config = GeneratorConfig {
            subsumption: true,
            canonicalize: false,
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            StateSpaceGenerator::new(&program, &lists.grammar, config),
            Err(GenerationError::Config(_))
        ));
    }

    #[test]
    fn stuck_states_are_not_final() {
        let lists = lists();
        let program = Program::new(vec![
            Statement::Load {
                lhs: "x".into(),
                base: "null".into(),
                selector: "next".into(),
                next: 1,
            },
            Statement::Return,
        ])
        .unwrap();
        let generation = StateSpaceGenerator::new(&program, &lists.grammar, GeneratorConfig::default())
            .unwrap()
            .generate([ProgramState::new(0, empty_heap(&lists))])
            .unwrap();
        assert!(generation.is_complete());
        assert_eq!(generation.space.len(), 1);
        assert_eq!(generation.space.final_states().count(), 0);
    }
}
