use core::fmt;

/// The role of the local node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Not allowed to perform the singleton duty.
    #[default]
    Standby,

    /// The one node allowed to perform the singleton duty.
    Master,
}

impl Role {
    /// Whether this is the master role.
    pub fn is_master(&self) -> bool {
        matches!(self, Self::Master)
    }

    /// The role matching a boolean "am I master" decision.
    pub fn from_master(is_master: bool) -> Self {
        if is_master {
            Self::Master
        } else {
            Self::Standby
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standby => f.write_str("STANDBY"),
            Self::Master => f.write_str("MASTER"),
        }
    }
}

/// The operating mode of the control loop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    /// Master resolution over the original chain.
    #[default]
    Normal,

    /// Master resolution over a node-local shuffle of the reachable nodes.
    Shuffle,

    /// Majority outage: reachable nodes take turns on a shared schedule.
    Pulse,
}

impl Mode {
    /// Numeric code used when exporting the mode as a gauge.
    pub fn code(&self) -> i64 {
        match self {
            Self::Normal => 0,
            Self::Shuffle => 1,
            Self::Pulse => 2,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("NORMAL"),
            Self::Shuffle => f.write_str("SHUFFLE"),
            Self::Pulse => f.write_str("PULSE"),
        }
    }
}
