//! Analysis session: the interning arena for node types and nonterminals.
//!
//! Every component that creates or looks up types or nonterminals receives the
//! session by reference. Two sessions never share state, so independent
//! analyses can run side by side in one process.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::heap::{GraphError, HeapConfiguration};
use crate::nonterminal::{BasicNonterminal, Nonterminal};

/// Interned node type identifier, valid within the session that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// A node type together with the selector names its nodes may originate.
///
/// A type without declared selectors is open: any selector is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    pub name: String,
    pub selectors: BTreeSet<String>,
}

impl NodeType {
    /// Whether nodes of this type may carry a selector with the given name.
    pub fn declares(&self, selector: &str) -> bool {
        self.selectors.is_empty() || self.selectors.contains(selector)
    }
}

/// Returns true for variable names that denote constants (`null`, booleans,
/// integer literals).
pub fn is_constant(name: &str) -> bool {
    matches!(name, "null" | "true" | "false") || name.parse::<i64>().is_ok()
}

/// Owner of all interned symbols for one analysis.
#[derive(Debug, Clone, Default)]
pub struct Session {
    types: Vec<NodeType>,
    type_index: HashMap<String, TypeId>,
    nonterminals: HashMap<String, BasicNonterminal>,
}

impl Session {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a type by name, creating an open type on first use.
    pub fn node_type(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.type_index.get(name) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(NodeType {
            name: name.to_string(),
            selectors: BTreeSet::new(),
        });
        self.type_index.insert(name.to_string(), id);
        id
    }

    /// Intern a type and declare the given selectors on it.
    pub fn declare_type<I, S>(&mut self, name: &str, selectors: I) -> TypeId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.node_type(name);
        let ty = &mut self.types[id.0 as usize];
        ty.selectors.extend(selectors.into_iter().map(Into::into));
        id
    }

    /// Look up a previously interned type by name.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.type_index.get(name).copied()
    }

    /// Resolve a type id to its definition.
    pub fn type_of(&self, id: TypeId) -> Result<&NodeType, GraphError> {
        self.types
            .get(id.0 as usize)
            .ok_or(GraphError::UnknownType(id))
    }

    /// Number of interned types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Intern a basic nonterminal.
    ///
    /// The rank is the length of `reduction_tentacles`. Re-interning an existing
    /// label with a different tentacle signature is an error.
    pub fn nonterminal(
        &mut self,
        label: &str,
        reduction_tentacles: &[bool],
    ) -> Result<Nonterminal, GraphError> {
        if let Some(existing) = self.nonterminals.get(label) {
            if existing.reduction_tentacles() != reduction_tentacles {
                return Err(GraphError::NonterminalConflict {
                    label: label.to_string(),
                    rank: existing.rank(),
                    requested: reduction_tentacles.len(),
                });
            }
            return Ok(Nonterminal::Basic(existing.clone()));
        }
        let basic = BasicNonterminal::new(label, reduction_tentacles.to_vec());
        self.nonterminals.insert(label.to_string(), basic.clone());
        Ok(Nonterminal::Basic(basic))
    }

    /// Look up a previously interned nonterminal by label.
    pub fn lookup_nonterminal(&self, label: &str) -> Option<Nonterminal> {
        self.nonterminals.get(label).cloned().map(Nonterminal::Basic)
    }

    /// Check every node type and selector of a configuration against the
    /// declarations in this session.
    pub fn check_selectors(&self, heap: &HeapConfiguration) -> Result<(), GraphError> {
        for node in heap.nodes() {
            let ty = heap.type_of(node).ok_or(GraphError::NodeNotFound(node))?;
            self.type_of(ty)?;
        }
        for (from, label, _) in heap.selectors() {
            let ty = heap.type_of(from).ok_or(GraphError::NodeNotFound(from))?;
            let decl = self.type_of(ty)?;
            if !decl.declares(label.name()) {
                return Err(GraphError::UndeclaredSelector {
                    ty: decl.name.clone(),
                    selector: label.name().to_string(),
                });
            }
        }
        Ok(())
    }
}
