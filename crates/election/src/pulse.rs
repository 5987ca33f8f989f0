use core::fmt;
use std::time::Duration;

use itertools::Itertools;
use tracing::warn;

use primus_config::PulseConfig;
use primus_core_types::{PriorityChain, PulseSchedule};
use primus_liveness::LivenessView;

use crate::seed::{hour_marker, pulse_entropy, shuffle_with_seed, signed_seed};
use crate::signer::{EntropySigner, SharedSecret, Unsigned};

/// Reachability of the original chain, and whether it amounts to an outage.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MajorityOutage {
    pub total: usize,
    pub healthy: usize,
    pub threshold: usize,
}

impl MajorityOutage {
    pub fn unreachable(&self) -> usize {
        self.total.saturating_sub(self.healthy)
    }

    pub fn is_outage(&self) -> bool {
        self.total > 0 && self.unreachable() >= self.threshold
    }

    /// An outage with at least one healthy node left to take a pulse slot.
    pub fn calls_for_pulse(&self) -> bool {
        self.is_outage() && self.healthy > 0
    }
}

impl fmt::Display for MajorityOutage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} unreachable (threshold {})",
            self.unreachable(),
            self.total,
            self.threshold
        )
    }
}

/// Whether `total - healthy` reaches `threshold` unreachable nodes.
pub fn check_majority_outage(total: usize, healthy: usize, threshold: usize) -> MajorityOutage {
    MajorityOutage {
        total,
        healthy: healthy.min(total),
        threshold,
    }
}

/// Check the original chain against the outage threshold.
pub fn observe_outage(original: &PriorityChain, view: &LivenessView, threshold: usize) -> MajorityOutage {
    let healthy = original.iter().filter(|node| view.is_node_alive(node)).count();
    check_majority_outage(original.len(), healthy, threshold)
}

/// Derives the shared pulse schedule of the healthy nodes.
///
/// The seed only depends on the hour and the sorted healthy names (keyed
/// with the cluster secret if any), so nodes that observe the same healthy
/// set compute the same order.
pub struct PulseScheduler {
    pulse_duration: Duration,
    sleep_duration: Duration,
    signer: Box<dyn EntropySigner>,
}

impl PulseScheduler {
    pub fn new(pulse_duration: Duration, sleep_duration: Duration) -> Self {
        Self {
            pulse_duration,
            sleep_duration,
            signer: Box::new(Unsigned),
        }
    }

    pub fn from_config(config: &PulseConfig) -> Self {
        let scheduler = Self::new(config.pulse_duration, config.sleep_duration);

        match &config.shared_secret {
            Some(secret) => scheduler.with_signer(SharedSecret::new(secret.as_bytes())),
            None => scheduler,
        }
    }

    pub fn with_signer(mut self, signer: impl EntropySigner + 'static) -> Self {
        self.signer = Box::new(signer);
        self
    }

    /// The schedule of the healthy nodes of `original` at `now` (time since
    /// the UNIX epoch), from the point of view of `my_name`.
    ///
    /// If `my_name` is not among the healthy nodes, the schedule has no slot
    /// for it and it abstains for the whole of pulse mode.
    pub fn schedule(
        &self,
        original: &PriorityChain,
        view: &LivenessView,
        my_name: &str,
        now: Duration,
    ) -> PulseSchedule {
        let healthy: Vec<&str> = original
            .iter()
            .filter(|node| view.is_node_alive(node))
            .map(|node| node.name())
            .collect();

        let mut order: Vec<String> = healthy.iter().sorted().map(|name| name.to_string()).collect();

        let entropy = pulse_entropy(hour_marker(now), healthy.iter().copied());
        let seed = signed_seed(self.signer.as_ref(), &entropy);
        shuffle_with_seed(&mut order, seed);

        let my_slot = order.iter().position(|name| name == my_name);

        if my_slot.is_none() {
            warn!(node = %my_name, "Not among the healthy nodes of the pulse schedule, abstaining");
        }

        PulseSchedule {
            pulse_duration: self.pulse_duration,
            sleep_duration: self.sleep_duration,
            my_slot,
            order,
        }
    }
}

#[cfg(test)]
mod tests {
    use primus_config::MajorityRule;
    use primus_core_types::{NodeDescriptor, PulsePhase};

    use super::*;

    const NAMES: [&str; 5] = ["amsterdam", "moscow", "almaty", "spb", "novosibirsk"];

    fn original() -> PriorityChain {
        PriorityChain::new(
            NAMES
                .iter()
                .enumerate()
                .map(|(i, n)| NodeDescriptor::new(*n, format!("10.0.0.{}", i + 1))),
        )
        .unwrap()
    }

    fn scheduler() -> PulseScheduler {
        PulseScheduler::new(Duration::from_secs(30), Duration::from_secs(60))
    }

    #[test]
    fn majority_threshold_of_five() {
        let threshold = MajorityRule::Majority.threshold(5);

        for healthy in [5, 4, 3] {
            assert!(!check_majority_outage(5, healthy, threshold).is_outage());
        }

        for healthy in [2, 1, 0] {
            assert!(check_majority_outage(5, healthy, threshold).is_outage());
        }
    }

    #[test]
    fn total_outage_has_nobody_to_pulse() {
        let threshold = MajorityRule::Majority.threshold(5);

        assert!(check_majority_outage(5, 1, threshold).calls_for_pulse());

        let outage = check_majority_outage(5, 0, threshold);
        assert!(outage.is_outage());
        assert!(!outage.calls_for_pulse());
    }

    #[test]
    fn custom_threshold() {
        let threshold = MajorityRule::Unreachable(2).threshold(5);
        assert!(!check_majority_outage(5, 4, threshold).is_outage());
        assert!(check_majority_outage(5, 3, threshold).is_outage());
    }

    #[test]
    fn empty_chain_is_never_an_outage() {
        let threshold = MajorityRule::Majority.threshold(0);
        assert!(!check_majority_outage(0, 0, threshold).is_outage());
    }

    #[test]
    fn outage_from_view() {
        let view = LivenessView::from_outcomes([("amsterdam", true), ("spb", true)]);
        let outage = observe_outage(&original(), &view, 3);

        assert_eq!(outage.healthy, 2);
        assert_eq!(outage.unreachable(), 3);
        assert!(outage.is_outage());
        assert_eq!(outage.to_string(), "3/5 unreachable (threshold 3)");
    }

    #[test]
    fn schedule_is_shared_within_the_hour() {
        let view = LivenessView::from_outcomes([("moscow", true), ("spb", true)]);
        let now = Duration::from_secs(3600 * 500 + 10);

        let moscow = scheduler().schedule(&original(), &view, "moscow", now);
        let spb = scheduler().schedule(&original(), &view, "spb", now + Duration::from_secs(600));

        assert_eq!(moscow.order, spb.order);
        assert_eq!(moscow.total_slots(), 2);
        assert_ne!(moscow.my_slot, spb.my_slot);
        assert_eq!(moscow.cycle_duration(), Duration::from_secs(120));
    }

    #[test]
    fn excluded_node_abstains() {
        let view = LivenessView::from_outcomes([("moscow", true), ("spb", true)]);
        let schedule = scheduler().schedule(&original(), &view, "almaty", Duration::from_secs(10));

        assert_eq!(schedule.my_slot, None);
        assert_eq!(schedule.phase_at(Duration::from_secs(10)), PulsePhase::Abstaining);
    }

    #[test]
    fn shared_secret_changes_the_seed_not_the_agreement() {
        let view = LivenessView::from_outcomes(NAMES.iter().map(|n| (*n, true)));
        let now = Duration::from_secs(3600 * 7);

        let a = scheduler()
            .with_signer(SharedSecret::new("cluster"))
            .schedule(&original(), &view, "amsterdam", now);
        let b = scheduler()
            .with_signer(SharedSecret::new("cluster"))
            .schedule(&original(), &view, "spb", now);

        assert_eq!(a.order, b.order);

        let mut sorted = a.order.clone();
        sorted.sort();
        let mut expected: Vec<String> = NAMES.iter().map(|n| n.to_string()).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
