//! A small pointer-manipulating instruction set with abstract semantics.
//!
//! Variables name nodes through variable edges; the constant `null` names the
//! null node and must be bound whenever a statement compares with or assigns
//! null. Reading a selector the heap does not provide leaves the target
//! variable undefined, i.e. unbound.

use heapgram_core::{HeapConfiguration, NodeId, SelectorLabel, TypeId};
use heapgram_grammar::ViolationPoints;
use log::warn;

use crate::error::SemanticsError;
use crate::semantics::Semantics;
use crate::state::ProgramState;

/// Name of the constant bound to the null node.
pub const NULL: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `lhs = rhs`
    Assign { lhs: String, rhs: String, next: usize },
    /// `lhs = null`
    AssignNull { lhs: String, next: usize },
    /// `lhs = base.selector`
    Load {
        lhs: String,
        base: String,
        selector: String,
        next: usize,
    },
    /// `base.selector = rhs`
    Store {
        base: String,
        selector: String,
        rhs: String,
        next: usize,
    },
    /// `lhs = new ty`, a node without selectors.
    New { lhs: String, ty: TypeId, next: usize },
    /// `if var == null goto then_pc else goto else_pc`
    IfNull {
        var: String,
        then_pc: usize,
        else_pc: usize,
    },
    Goto(usize),
    /// Nondeterministic choice among the listed locations.
    Branch(Vec<usize>),
    Return,
}

impl Semantics for Statement {
    fn compute_successors(&self, state: &ProgramState) -> Result<Vec<ProgramState>, SemanticsError> {
        let heap = &state.heap;
        let successor = |heap: HeapConfiguration, pc: usize| vec![ProgramState::new(pc, heap)];

        match self {
            Statement::Assign { lhs, rhs, next } => {
                let value = heap.variable_target(rhs);
                Ok(successor(assign(heap, lhs, value)?, *next))
            }
            Statement::AssignNull { lhs, next } => {
                let null = null_node(heap)?;
                Ok(successor(assign(heap, lhs, Some(null))?, *next))
            }
            Statement::Load {
                lhs,
                base,
                selector,
                next,
            } => {
                let Some(node) = dereference(heap, base) else {
                    return Ok(Vec::new());
                };
                let value = heap.selector_named(node, selector);
                Ok(successor(assign(heap, lhs, value)?, *next))
            }
            Statement::Store {
                base,
                selector,
                rhs,
                next,
            } => {
                let Some(node) = dereference(heap, base) else {
                    return Ok(Vec::new());
                };
                let value = heap.variable_target(rhs);
                let old = heap
                    .node(node)
                    .and_then(|data| {
                        data.selectors()
                            .find(|(label, _)| label.name() == selector.as_str())
                    })
                    .map(|(label, _)| label.clone());

                let mut builder = heap.clone().builder();
                if let Some(label) = old {
                    builder.remove_selector(node, &label)?;
                }
                if let Some(target) = value {
                    builder.add_selector(node, SelectorLabel::new(selector.as_str()), target)?;
                }
                Ok(successor(builder.build(), *next))
            }
            Statement::New { lhs, ty, next } => {
                let mut builder = heap.clone().builder();
                let fresh = builder.add_node(*ty);
                builder.rebind_variable(lhs, fresh)?;
                Ok(successor(builder.build(), *next))
            }
            Statement::IfNull {
                var,
                then_pc,
                else_pc,
            } => {
                let value = heap.variable_target(var);
                let null = heap.variable_target(NULL);
                Ok(match (value, null) {
                    (Some(value), Some(null)) if value == null => vec![state.at(*then_pc)],
                    (Some(_), Some(_)) => vec![state.at(*else_pc)],
                    // undefined conditions take both branches
                    _ => vec![state.at(*then_pc), state.at(*else_pc)],
                })
            }
            Statement::Goto(pc) => Ok(vec![state.at(*pc)]),
            Statement::Branch(pcs) => Ok(pcs.iter().map(|&pc| state.at(pc)).collect()),
            Statement::Return => Ok(Vec::new()),
        }
    }

    fn potential_violation_points(&self) -> ViolationPoints {
        match self {
            Statement::Load { base, selector, .. } | Statement::Store { base, selector, .. } => {
                ViolationPoints::new().with(base.as_str(), selector.as_str())
            }
            _ => ViolationPoints::new(),
        }
    }

    fn successor_pcs(&self) -> Vec<usize> {
        match self {
            Statement::Assign { next, .. }
            | Statement::AssignNull { next, .. }
            | Statement::Load { next, .. }
            | Statement::Store { next, .. }
            | Statement::New { next, .. } => vec![*next],
            Statement::IfNull {
                then_pc, else_pc, ..
            } => vec![*then_pc, *else_pc],
            Statement::Goto(pc) => vec![*pc],
            Statement::Branch(pcs) => pcs.clone(),
            Statement::Return => Vec::new(),
        }
    }
}

fn null_node(heap: &HeapConfiguration) -> Result<NodeId, SemanticsError> {
    heap.variable_target(NULL)
        .ok_or_else(|| SemanticsError::MissingConstant {
            name: NULL.to_string(),
        })
}

/// Bind `lhs` to `value`, or unbind it when the value is undefined.
fn assign(
    heap: &HeapConfiguration,
    lhs: &str,
    value: Option<NodeId>,
) -> Result<HeapConfiguration, SemanticsError> {
    let mut builder = heap.clone().builder();
    match value {
        Some(node) => builder.rebind_variable(lhs, node)?,
        None if heap.variable_target(lhs).is_some() => {
            builder.remove_variable(lhs)?;
        }
        None => {}
    }
    Ok(builder.build())
}

/// The node `base` names, unless it is undefined or null.
fn dereference(heap: &HeapConfiguration, base: &str) -> Option<NodeId> {
    let Some(node) = heap.variable_target(base) else {
        warn!("dereferencing undefined variable {base}");
        return None;
    };
    if heap.variable_target(NULL) == Some(node) {
        warn!("null dereference through {base}");
        return None;
    }
    Some(node)
}
