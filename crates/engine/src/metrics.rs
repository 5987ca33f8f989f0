use std::ops::Deref;
use std::sync::Arc;

use primus_core_types::{Mode, Role};
use primus_metrics::{exponential_buckets, Counter, Gauge, Histogram, SharedRegistry};

#[derive(Clone, Debug)]
pub struct Metrics(Arc<Inner>);

impl Deref for Metrics {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct Inner {
    /// 1 while the local node is master
    pub is_master: Gauge,

    /// Current mode: 0 normal, 1 shuffle, 2 pulse
    pub mode: Gauge,

    /// Number of role transitions
    pub role_transitions: Counter,

    /// Number of chain shuffles installed
    pub shuffles: Counter,

    /// Number of times pulse mode was entered
    pub pulse_entries: Counter,

    /// Number of reachable nodes of the original chain, as of the last tick
    pub reachable_nodes: Gauge,

    /// Number of ticks that failed
    pub tick_failures: Counter,

    /// Time taken by each tick, in seconds
    pub tick_duration: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            is_master: Gauge::default(),
            mode: Gauge::default(),
            role_transitions: Counter::default(),
            shuffles: Counter::default(),
            pulse_entries: Counter::default(),
            reachable_nodes: Gauge::default(),
            tick_failures: Counter::default(),
            tick_duration: Histogram::new(exponential_buckets(0.01, 2.0, 12)),
        }))
    }

    pub fn register(registry: &SharedRegistry) -> Self {
        let metrics = Self::new();

        registry.with_prefix("primus", |registry| {
            registry.register(
                "is_master",
                "1 while the local node is master",
                metrics.is_master.clone(),
            );

            registry.register(
                "mode",
                "Current mode: 0 normal, 1 shuffle, 2 pulse",
                metrics.mode.clone(),
            );

            registry.register(
                "role_transitions",
                "Number of role transitions",
                metrics.role_transitions.clone(),
            );

            registry.register(
                "shuffles",
                "Number of chain shuffles installed",
                metrics.shuffles.clone(),
            );

            registry.register(
                "pulse_entries",
                "Number of times pulse mode was entered",
                metrics.pulse_entries.clone(),
            );

            registry.register(
                "reachable_nodes",
                "Number of reachable nodes of the original chain, as of the last tick",
                metrics.reachable_nodes.clone(),
            );

            registry.register(
                "tick_failures",
                "Number of ticks that failed",
                metrics.tick_failures.clone(),
            );

            registry.register(
                "tick_duration_seconds",
                "Time taken by each tick, in seconds",
                metrics.tick_duration.clone(),
            );
        });

        metrics
    }

    pub fn set_role(&self, role: Role) {
        self.is_master.set(i64::from(role.is_master()));
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.set(mode.code());
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
