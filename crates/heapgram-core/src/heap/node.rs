//! Nodes and selector labels.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::session::TypeId;

/// Node identifier, unique within one heap configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Label of a selector edge: a field name with an optional annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectorLabel {
    name: String,
    annotation: Option<String>,
}

impl SelectorLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: None,
        }
    }

    pub fn annotated(name: impl Into<String>, annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotation: Some(annotation.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }
}

impl From<&str> for SelectorLabel {
    fn from(name: &str) -> Self {
        SelectorLabel::new(name)
    }
}

impl fmt::Display for SelectorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.annotation {
            Some(annotation) => write!(f, "{}[{}]", self.name, annotation),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A heap node: its type and its outgoing selector edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub ty: TypeId,
    pub(crate) selectors: BTreeMap<SelectorLabel, NodeId>,
}

impl Node {
    pub fn new(ty: TypeId) -> Self {
        Self {
            ty,
            selectors: BTreeMap::new(),
        }
    }

    /// Outgoing selector edges in label order.
    pub fn selectors(&self) -> impl Iterator<Item = (&SelectorLabel, NodeId)> + '_ {
        self.selectors.iter().map(|(label, &target)| (label, target))
    }

    pub fn selector(&self, label: &SelectorLabel) -> Option<NodeId> {
        self.selectors.get(label).copied()
    }

    /// Target of the first outgoing selector with the given name, regardless of
    /// annotation.
    pub fn selector_named(&self, name: &str) -> Option<NodeId> {
        self.selectors
            .iter()
            .find(|(label, _)| label.name() == name)
            .map(|(_, &target)| target)
    }

    pub fn has_selectors(&self) -> bool {
        !self.selectors.is_empty()
    }
}
