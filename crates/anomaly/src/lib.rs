//! Anomaly signal: a local judgment of whether this node is under attack.
//!
//! The control loop feeds observations into an [`AnomalySignal`] and asks it
//! for a verdict every tick. Two implementations are provided:
//!
//! - [`Quiescent`] never reports an attack.
//! - [`ThresholdDetector`] reports an attack on a sustained run of failures,
//!   a slow rolling average of response times, or CPU / inbound traffic
//!   above static thresholds.

#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

use std::time::Duration;

use primus_config::{AnomalyConfig, DetectorKind};

mod quiescent;
mod resources;
mod threshold;

pub use quiescent::Quiescent;
pub use resources::{ResourceSampler, SystemSampler};
pub use threshold::{AttackReason, ThresholdDetector, Thresholds};

/// Turns failure, latency and resource observations into a boolean attack flag.
pub trait AnomalySignal: Send {
    /// A probe or service cycle failed.
    fn record_failure(&mut self);

    /// A probe or service cycle succeeded.
    fn record_success(&mut self);

    /// Duration of one service cycle.
    fn record_response_time(&mut self, latency: Duration);

    /// Whether an attack is currently flagged.
    ///
    /// Takes `&mut self` so that implementations can sample resources.
    fn is_under_attack(&mut self) -> bool;

    /// Clear every counter and the flag.
    fn reset(&mut self);
}

impl<S> AnomalySignal for Box<S>
where
    S: AnomalySignal + ?Sized,
{
    fn record_failure(&mut self) {
        (**self).record_failure()
    }

    fn record_success(&mut self) {
        (**self).record_success()
    }

    fn record_response_time(&mut self, latency: Duration) {
        (**self).record_response_time(latency)
    }

    fn is_under_attack(&mut self) -> bool {
        (**self).is_under_attack()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Build the signal selected by the configuration.
pub fn from_config(config: &AnomalyConfig) -> Box<dyn AnomalySignal> {
    match config.detector {
        DetectorKind::Disabled => Box::new(Quiescent),
        DetectorKind::Threshold => {
            let thresholds = Thresholds::from(config);

            if config.resource_checks {
                Box::new(ThresholdDetector::with_sampler(thresholds, SystemSampler::new()))
            } else {
                Box::new(ThresholdDetector::new(thresholds))
            }
        }
    }
}
