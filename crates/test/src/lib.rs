//! Testing utilities: chain builders, a scripted liveness probe, a
//! recording role handler, a manual clock and a forceable anomaly signal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use primus_anomaly::AnomalySignal;
use primus_core_types::{IdentitySource, NodeDescriptor, PriorityChain, SelfIdentity};
use primus_engine::{Clock, RoleHandler, TickError};
use primus_liveness::LivenessProbe;

/// A chain of the given names, with addresses `10.0.0.1`, `10.0.0.2`, ...
pub fn make_chain(names: &[&str]) -> PriorityChain {
    PriorityChain::new(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| NodeDescriptor::new(*name, format!("10.0.0.{}", i + 1))),
    )
    .expect("names must be unique and non-empty")
}

/// The identity of `name` in `chain`, or an unresolved one.
pub fn make_identity(chain: &PriorityChain, name: &str) -> SelfIdentity {
    match chain.get(name) {
        Some(node) => SelfIdentity::new(node, chain.position_of(name), IdentitySource::Override),
        None => SelfIdentity::unresolved(),
    }
}

pub fn init_logging() {
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("primus=debug"));

    let _ = FmtSubscriber::builder()
        .with_target(false)
        .with_env_filter(filter)
        .with_test_writer()
        .finish()
        .try_init();
}

/// A probe whose answers are set by the test.
///
/// Addresses are dead until set alive. Clones share their state.
#[derive(Clone, Debug, Default)]
pub struct ScriptedProbe {
    inner: Arc<ProbeState>,
}

#[derive(Debug, Default)]
struct ProbeState {
    alive: Mutex<HashMap<String, bool>>,
    probes: AtomicUsize,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// A probe where every node of `chain` is alive.
    pub fn all_alive(chain: &PriorityChain) -> Self {
        let probe = Self::new();
        for node in chain {
            probe.set_alive(node.address(), true);
        }
        probe
    }

    pub fn set_alive(&self, address: &str, alive: bool) {
        self.lock().insert(address.to_string(), alive);
    }

    /// Set the liveness of a node of `chain` by name.
    pub fn set_node(&self, chain: &PriorityChain, name: &str, alive: bool) {
        let node = chain.get(name).expect("unknown node");
        self.set_alive(node.address(), alive);
    }

    /// Make exactly the given nodes of `chain` alive.
    pub fn only(&self, chain: &PriorityChain, names: &[&str]) {
        for node in chain {
            self.set_alive(node.address(), names.contains(&node.name()));
        }
    }

    /// Number of probes run so far.
    pub fn probe_count(&self) -> usize {
        self.inner.probes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, bool>> {
        self.inner.alive.lock().expect("poisoned lock")
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn probe(&self, address: &str) -> bool {
        self.inner.probes.fetch_add(1, Ordering::SeqCst);
        self.lock().get(address).copied().unwrap_or(false)
    }
}

/// A role callback, as recorded by [`RecordingHandler`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Master { term: u64 },
    Standby,
}

/// Records every callback. Clones share their state.
#[derive(Clone, Debug, Default)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<Transition>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Transition> {
        self.events.lock().expect("poisoned lock").clone()
    }

    pub fn clear(&self) {
        self.events.lock().expect("poisoned lock").clear();
    }

    /// Make the following callbacks fail, after recording them.
    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn record(&self, transition: Transition) -> eyre::Result<()> {
        self.events.lock().expect("poisoned lock").push(transition);

        if self.fail.load(Ordering::SeqCst) {
            eyre::bail!("handler failure requested by the test");
        }

        Ok(())
    }
}

#[async_trait]
impl RoleHandler for RecordingHandler {
    async fn on_become_master(&self, term: u64) -> eyre::Result<()> {
        self.record(Transition::Master { term })
    }

    async fn on_become_standby(&self) -> eyre::Result<()> {
        self.record(Transition::Standby)
    }
}

/// A clock set by the test. Clones share their state.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn at(now: Duration) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: Duration) {
        *self.now.lock().expect("poisoned lock") = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().expect("poisoned lock") += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<Duration, TickError> {
        Ok(*self.now.lock().expect("poisoned lock"))
    }
}

/// An anomaly signal raised and lowered by the test, counting what it is fed.
#[derive(Clone, Debug, Default)]
pub struct ForcedSignal {
    inner: Arc<SignalState>,
}

#[derive(Debug, Default)]
struct SignalState {
    flagged: AtomicBool,
    failures: AtomicUsize,
    successes: AtomicUsize,
    responses: AtomicUsize,
    resets: AtomicUsize,
}

impl ForcedSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.inner.flagged.store(true, Ordering::SeqCst);
    }

    pub fn failures(&self) -> usize {
        self.inner.failures.load(Ordering::SeqCst)
    }

    pub fn successes(&self) -> usize {
        self.inner.successes.load(Ordering::SeqCst)
    }

    pub fn responses(&self) -> usize {
        self.inner.responses.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.inner.resets.load(Ordering::SeqCst)
    }
}

impl AnomalySignal for ForcedSignal {
    fn record_failure(&mut self) {
        self.inner.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn record_success(&mut self) {
        self.inner.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn record_response_time(&mut self, _latency: Duration) {
        self.inner.responses.fetch_add(1, Ordering::SeqCst);
    }

    fn is_under_attack(&mut self) -> bool {
        self.inner.flagged.load(Ordering::SeqCst)
    }

    fn reset(&mut self) {
        self.inner.resets.fetch_add(1, Ordering::SeqCst);
        self.inner.flagged.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_probe() {
        let chain = make_chain(&["a", "b"]);
        let probe = ScriptedProbe::new();

        assert!(!probe.probe("10.0.0.1").await);
        probe.set_node(&chain, "a", true);
        assert!(probe.probe("10.0.0.1").await);

        probe.only(&chain, &["b"]);
        assert!(!probe.probe("10.0.0.1").await);
        assert!(probe.probe("10.0.0.2").await);
        assert_eq!(probe.probe_count(), 4);
    }

    #[tokio::test]
    async fn recording_handler() {
        let handler = RecordingHandler::new();
        handler.on_become_master(1).await.unwrap();
        handler.fail(true);
        assert!(handler.on_become_standby().await.is_err());

        assert_eq!(
            handler.events(),
            [Transition::Master { term: 1 }, Transition::Standby]
        );
    }
}
