use core::fmt;
use std::collections::HashSet;

use thiserror::Error;

use crate::{NodeDescriptor, Position};

/// Errors raised when building a [`PriorityChain`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ChainError {
    /// A node at the given index has an empty name.
    #[error("Node at index {0} has an empty name")]
    EmptyName(usize),

    /// Two nodes share the same name.
    #[error("Node name '{0}' appears more than once in the chain")]
    DuplicateName(String),
}

/// An ordered list of nodes, unique by name.
///
/// The order is the tie-break rule for mastership: the earliest reachable
/// entry is the master. Every process in the cluster is configured with the
/// same original chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriorityChain {
    nodes: Vec<NodeDescriptor>,
}

impl PriorityChain {
    /// Build a chain from nodes in priority order.
    pub fn new(nodes: impl IntoIterator<Item = NodeDescriptor>) -> Result<Self, ChainError> {
        let nodes: Vec<_> = nodes.into_iter().collect();
        let mut seen = HashSet::with_capacity(nodes.len());

        for (index, node) in nodes.iter().enumerate() {
            if node.name().is_empty() {
                return Err(ChainError::EmptyName(index));
            }

            if !seen.insert(node.name()) {
                return Err(ChainError::DuplicateName(node.name().to_string()));
            }
        }

        Ok(Self { nodes })
    }

    /// A chain with no nodes. Nobody is ever master of an empty chain.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of nodes in the chain.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chain has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over the nodes in priority order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &NodeDescriptor> + '_ {
        self.nodes.iter()
    }

    /// The nodes in priority order.
    pub fn as_slice(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Iterate over the node names in priority order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(NodeDescriptor::name)
    }

    /// The node with the given (exact) name, if any.
    pub fn get(&self, name: &str) -> Option<&NodeDescriptor> {
        self.nodes.iter().find(|node| node.name() == name)
    }

    /// Whether a node with the given (exact) name is in the chain.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Position of the node with the given (exact) name.
    pub fn position_of(&self, name: &str) -> Position {
        self.nodes
            .iter()
            .position(|node| node.name() == name)
            .map_or(Position::NotFound, Position::At)
    }

    /// Keep only the nodes matching the predicate, preserving their order.
    pub fn filter(&self, mut keep: impl FnMut(&NodeDescriptor) -> bool) -> Self {
        Self {
            nodes: self.nodes.iter().filter(|node| keep(node)).cloned().collect(),
        }
    }

    /// Rearrange the chain with the given function.
    ///
    /// The function only ever sees the nodes already in this chain, so the
    /// result stays a permutation of it.
    pub fn permuted(&self, permute: impl FnOnce(&mut [NodeDescriptor])) -> Self {
        let mut nodes = self.nodes.clone();
        permute(&mut nodes);
        Self { nodes }
    }

    /// Whether every node of this chain also belongs to `other`.
    pub fn is_subset_of(&self, other: &PriorityChain) -> bool {
        self.nodes.iter().all(|node| other.contains(node.name()))
    }
}

impl<'a> IntoIterator for &'a PriorityChain {
    type Item = &'a NodeDescriptor;
    type IntoIter = core::slice::Iter<'a, NodeDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl fmt::Display for PriorityChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(" → ")?;
            }
            f.write_str(node.name())?;
        }
        Ok(())
    }
}
