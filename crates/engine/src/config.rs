use std::time::Duration;

use primus_config::ElectionConfig;

/// Engine-internal control loop configuration.
///
/// This wraps the user-facing [`ElectionConfig`] with fields
/// that are derived at startup rather than set by the operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Delay before the first tick
    pub startup_delay: Duration,

    /// Interval between two ticks
    pub tick_interval: Duration,

    /// Minimum time a shuffled chain is kept
    pub shuffle_hold: Duration,

    /// Majority outage threshold, in unreachable nodes.
    ///
    /// Derived from `election.majority` and the length of the original chain.
    pub outage_threshold: usize,
}

impl EngineConfig {
    /// Build from the user-facing config and the length of the original chain.
    pub fn new(cfg: &ElectionConfig, chain_len: usize) -> Self {
        Self {
            startup_delay: cfg.startup_delay,
            tick_interval: cfg.tick_interval,
            shuffle_hold: cfg.shuffle_hold,
            outage_threshold: cfg.majority.threshold(chain_len),
        }
    }
}
