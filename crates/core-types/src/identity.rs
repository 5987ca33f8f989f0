use core::fmt;

use crate::{NodeDescriptor, PriorityChain};

/// Position of a node inside a chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Position {
    /// Zero-based index in the chain.
    At(usize),

    /// The node is not part of the chain.
    NotFound,
}

impl Position {
    /// The index, if the node was found.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::At(index) => Some(*index),
            Self::NotFound => None,
        }
    }

    /// Whether the node was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::At(_))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(index) => write!(f, "#{index}"),
            Self::NotFound => f.write_str("not found"),
        }
    }
}

/// How the local node was matched against the chain at startup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdentitySource {
    /// The configured node name override.
    Override,

    /// One of the local network addresses.
    LocalAddress,

    /// Nothing matched, fell back to the first entry of the chain.
    Fallback,

    /// Nothing matched and the chain was empty.
    Unresolved,
}

/// The local node, as seen from the working chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfIdentity {
    name: String,
    address: String,
    position: Position,
    source: IdentitySource,
}

impl SelfIdentity {
    /// The identity of a node resolved from `source` at `position`.
    pub fn new(node: &NodeDescriptor, position: Position, source: IdentitySource) -> Self {
        Self {
            name: node.name().to_string(),
            address: node.address().to_string(),
            position,
            source,
        }
    }

    /// An identity that matches nothing. Such a node is never master.
    pub fn unresolved() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            position: Position::NotFound,
            source: IdentitySource::Unresolved,
        }
    }

    /// Name of the local node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the local node, as listed in the chain.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Position of the local node in the current working chain.
    pub fn position(&self) -> Position {
        self.position
    }

    /// How the identity was resolved.
    pub fn source(&self) -> IdentitySource {
        self.source
    }

    /// Recompute the position against a (new) working chain.
    pub fn relocate(&mut self, chain: &PriorityChain) {
        self.position = if self.name.is_empty() {
            Position::NotFound
        } else {
            chain.position_of(&self.name)
        };
    }
}

impl fmt::Display for SelfIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            return f.write_str("<unresolved>");
        }

        write!(f, "{} {}", self.name, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relocate_follows_the_chain() {
        let chain = PriorityChain::new([
            NodeDescriptor::new("a", "10.0.0.1"),
            NodeDescriptor::new("b", "10.0.0.2"),
        ])
        .unwrap();

        let b = chain.get("b").unwrap();
        let mut me = SelfIdentity::new(b, Position::At(1), IdentitySource::Override);

        let reordered = chain.permuted(|nodes| nodes.reverse());
        me.relocate(&reordered);
        assert_eq!(me.position(), Position::At(0));

        let without_me = chain.filter(|n| n.name() != "b");
        me.relocate(&without_me);
        assert_eq!(me.position(), Position::NotFound);
    }

    #[test]
    fn unresolved_is_never_found() {
        let chain = PriorityChain::new([NodeDescriptor::new("a", "10.0.0.1")]).unwrap();
        let mut me = SelfIdentity::unresolved();
        me.relocate(&chain);

        assert_eq!(me.position(), Position::NotFound);
        assert_eq!(me.to_string(), "<unresolved>");
    }
}
