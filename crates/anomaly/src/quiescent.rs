use std::time::Duration;

use crate::AnomalySignal;

/// An anomaly signal that never reports an attack.
///
/// Every observation is discarded.
#[derive(Copy, Clone, Debug, Default)]
pub struct Quiescent;

impl AnomalySignal for Quiescent {
    fn record_failure(&mut self) {}

    fn record_success(&mut self) {}

    fn record_response_time(&mut self, _latency: Duration) {}

    fn is_under_attack(&mut self) -> bool {
        false
    }

    fn reset(&mut self) {}
}
