use core::fmt;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use primus_config::AnomalyConfig;

use crate::{AnomalySignal, ResourceSampler};

/// Static limits of a [`ThresholdDetector`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Thresholds {
    pub max_failures: u32,
    pub latency_window: usize,
    pub latency_min_samples: usize,
    pub latency_threshold: Duration,
    pub cpu_percent: f32,
    pub ingress_bytes_per_sec: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&AnomalyConfig::default())
    }
}

impl From<&AnomalyConfig> for Thresholds {
    fn from(config: &AnomalyConfig) -> Self {
        Self {
            max_failures: config.max_failures.max(1),
            latency_window: config.latency_window.max(1),
            latency_min_samples: config.latency_min_samples.clamp(1, config.latency_window.max(1)),
            latency_threshold: config.latency_threshold,
            cpu_percent: config.cpu_threshold,
            ingress_bytes_per_sec: config.ingress_threshold.as_u64(),
        }
    }
}

/// Why an attack was flagged.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AttackReason {
    ConsecutiveFailures(u32),
    SlowResponses(Duration),
    Cpu(f32),
    Ingress(u64),
}

impl fmt::Display for AttackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsecutiveFailures(n) => write!(f, "{n} consecutive failures"),
            Self::SlowResponses(avg) => write!(f, "average response time {avg:?}"),
            Self::Cpu(usage) => write!(f, "CPU usage {usage:.1}%"),
            Self::Ingress(rate) => write!(f, "inbound traffic {rate} B/s"),
        }
    }
}

struct Ingress {
    bytes: u64,
    at: Instant,
}

/// Flags an attack when any observation crosses its threshold.
///
/// The flag is sticky: once raised it stays raised until [`reset`](AnomalySignal::reset).
pub struct ThresholdDetector {
    thresholds: Thresholds,
    consecutive_failures: u32,
    response_times: VecDeque<Duration>,
    sampler: Option<Box<dyn ResourceSampler>>,
    last_ingress: Option<Ingress>,
    reason: Option<AttackReason>,
}

impl ThresholdDetector {
    /// A detector without resource checks.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            consecutive_failures: 0,
            response_times: VecDeque::with_capacity(thresholds.latency_window),
            sampler: None,
            last_ingress: None,
            reason: None,
        }
    }

    /// A detector that also checks CPU and inbound traffic.
    pub fn with_sampler(thresholds: Thresholds, sampler: impl ResourceSampler + 'static) -> Self {
        Self {
            sampler: Some(Box::new(sampler)),
            ..Self::new(thresholds)
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Why the attack was flagged, if it was.
    pub fn reason(&self) -> Option<AttackReason> {
        self.reason
    }

    /// Average of the rolling window, once it holds enough samples.
    pub fn average_response_time(&self) -> Option<Duration> {
        if self.response_times.len() < self.thresholds.latency_min_samples {
            return None;
        }

        let total: Duration = self.response_times.iter().sum();
        let count = u32::try_from(self.response_times.len()).ok()?;
        Some(total / count)
    }

    /// Sample resources as of `now`.
    pub fn check_resources_at(&mut self, now: Instant) {
        let Some(sampler) = self.sampler.as_mut() else {
            return;
        };

        let cpu = sampler.cpu_usage();
        let received = sampler.total_received();

        debug!(cpu, received, "Sampled resources");

        if cpu > self.thresholds.cpu_percent {
            self.flag(AttackReason::Cpu(cpu));
        }

        if let Some(last) = self.last_ingress.replace(Ingress { bytes: received, at: now }) {
            let elapsed = now.saturating_duration_since(last.at).as_secs_f64();

            if elapsed > 0.0 {
                let rate = received.saturating_sub(last.bytes) as f64 / elapsed;

                if rate > self.thresholds.ingress_bytes_per_sec as f64 {
                    self.flag(AttackReason::Ingress(rate as u64));
                }
            }
        }
    }

    fn flag(&mut self, reason: AttackReason) {
        if self.reason.is_none() {
            warn!(%reason, "Attack suspected");
            self.reason = Some(reason);
        }
    }
}

impl AnomalySignal for ThresholdDetector {
    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if self.consecutive_failures >= self.thresholds.max_failures {
            self.flag(AttackReason::ConsecutiveFailures(self.consecutive_failures));
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_sub(1);
    }

    fn record_response_time(&mut self, latency: Duration) {
        if self.response_times.len() == self.thresholds.latency_window {
            self.response_times.pop_front();
        }

        self.response_times.push_back(latency);

        if let Some(average) = self.average_response_time() {
            if average > self.thresholds.latency_threshold {
                self.flag(AttackReason::SlowResponses(average));
            }
        }
    }

    fn is_under_attack(&mut self) -> bool {
        self.check_resources_at(Instant::now());
        self.reason.is_some()
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.response_times.clear();
        self.reason = None;
    }
}
