use core::fmt;
use core::hash::{Hash, Hasher};

/// Identifies one replica taking part in the election.
///
/// Two descriptors are equal when their names are equal, whatever their address.
#[derive(Clone, Debug, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDescriptor {
    name: String,
    address: String,
}

impl NodeDescriptor {
    /// Create a new descriptor from a name and a host address.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }

    /// The unique name of this node.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The host address (IP or hostname) other nodes probe.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether this node goes by the given name, ignoring ASCII case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl PartialEq for NodeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Hash for NodeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for NodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}
