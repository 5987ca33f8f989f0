use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use primus_anomaly::AnomalySignal;
use primus_core_types::{Mode, PriorityChain, PulsePhase, PulseSchedule, Role, SelfIdentity};
use primus_election::{
    chain_status, observe_outage, resolve_master, ChainShuffler, MajorityOutage, PulseScheduler,
    WorkingChain,
};
use primus_liveness::{LivenessListener, LivenessProbe, LivenessView};

use crate::{Clock, EngineConfig, Metrics, RoleHandler, TickError};

/// Everything a [`LeaderLoop`] is built from.
pub struct Params<P, H, C> {
    pub config: EngineConfig,
    pub original: PriorityChain,
    pub me: SelfIdentity,
    pub probe: P,
    pub signal: Box<dyn AnomalySignal>,
    pub shuffler: ChainShuffler,
    pub scheduler: PulseScheduler,
    pub handler: H,
    pub clock: C,
    pub metrics: Metrics,
    pub listener: Option<LivenessListener>,
}

/// Role and mode after a tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TickOutcome {
    pub role: Role,
    pub mode: Mode,
}

/// Stops a running [`LeaderLoop`] at its next wait.
#[derive(Clone, Debug)]
pub struct StopHandle(Arc<watch::Sender<bool>>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Forces a [`LeaderLoop`] to shuffle its chain at its next tick outside
/// pulse mode, as if the anomaly signal had reported an attack.
#[derive(Clone, Debug)]
pub struct ShuffleHandle(Arc<watch::Sender<bool>>);

impl ShuffleHandle {
    pub fn force_shuffle(&self) {
        self.0.send_replace(true);
    }

    /// Whether a forced shuffle is still waiting for a tick.
    pub fn is_pending(&self) -> bool {
        *self.0.borrow()
    }
}

/// Why a role transition happens, for the logs.
#[derive(Copy, Clone, Debug)]
enum Cause {
    Chain,
    Pulse,
    PulseEntry,
    Attack,
    Forced,
    Shutdown,
}

impl Cause {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Chain => "chain",
            Self::Pulse => "pulse",
            Self::PulseEntry => "entering pulse mode",
            Self::Attack => "attack suspected",
            Self::Forced => "shuffle forced",
            Self::Shutdown => "shutdown",
        }
    }
}

/// The control loop: recomputes the role of the local node every tick.
///
/// Each tick observes the liveness of the original chain once, then, in order:
///
/// 1. enters or leaves pulse mode depending on whether a majority of the
///    chain is unreachable while some node still answers,
/// 2. in pulse mode, is master exactly while its pulse slot is active,
/// 3. otherwise, shuffles the chain and steps down if the anomaly signal
///    reports an attack or a shuffle was forced through a [`ShuffleHandle`],
/// 4. otherwise, is master iff every node ahead of it in the working chain
///    is unreachable.
///
/// The role handler is called once per transition.
pub struct LeaderLoop<P, H, C> {
    config: EngineConfig,
    working: WorkingChain,
    me: SelfIdentity,
    probe: P,
    signal: Box<dyn AnomalySignal>,
    shuffler: ChainShuffler,
    scheduler: PulseScheduler,
    handler: H,
    clock: C,
    metrics: Metrics,
    listener: Option<LivenessListener>,

    role: Role,
    mode: Mode,
    term: u64,
    pulse: Option<PulseSchedule>,

    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    shuffle_tx: Arc<watch::Sender<bool>>,
}

impl<P, H, C> LeaderLoop<P, H, C>
where
    P: LivenessProbe,
    H: RoleHandler,
    C: Clock,
{
    pub fn new(params: Params<P, H, C>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (shuffle_tx, _) = watch::channel(false);

        let mut me = params.me;
        me.relocate(&params.original);

        params.metrics.set_role(Role::Standby);
        params.metrics.set_mode(Mode::Normal);

        Self {
            config: params.config,
            working: WorkingChain::new(params.original),
            me,
            probe: params.probe,
            signal: params.signal,
            shuffler: params.shuffler,
            scheduler: params.scheduler,
            handler: params.handler,
            clock: params.clock,
            metrics: params.metrics,
            listener: params.listener,
            role: Role::Standby,
            mode: Mode::Normal,
            term: 0,
            pulse: None,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            shuffle_tx: Arc::new(shuffle_tx),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop_tx))
    }

    pub fn shuffle_handle(&self) -> ShuffleHandle {
        ShuffleHandle(Arc::clone(&self.shuffle_tx))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Number of promotions so far.
    pub fn term(&self) -> u64 {
        self.term
    }

    pub fn identity(&self) -> &SelfIdentity {
        &self.me
    }

    pub fn working_chain(&self) -> &WorkingChain {
        &self.working
    }

    pub fn pulse_schedule(&self) -> Option<&PulseSchedule> {
        self.pulse.as_ref()
    }

    pub fn listener(&self) -> Option<&LivenessListener> {
        self.listener.as_ref()
    }

    /// Run until stopped: start the listener, wait for the startup delay,
    /// then tick at the configured interval.
    ///
    /// A failed tick is logged and counted, never fatal.
    #[tracing::instrument(name = "leader", skip_all, fields(node = %self.me.name()))]
    pub async fn run(&mut self) {
        self.start_listener().await;

        info!(
            position = %self.me.position(),
            chain = %self.working.original(),
            interval = ?self.config.tick_interval,
            "Starting leader election loop"
        );

        if !self.sleep_or_stop(self.config.startup_delay).await {
            loop {
                match self.tick().await {
                    Ok(outcome) => {
                        debug!(role = %outcome.role, mode = %outcome.mode, "Tick done");
                    }
                    Err(e) => {
                        error!("Tick failed: {e}");
                        self.metrics.tick_failures.inc();
                        self.signal.record_failure();
                    }
                }

                if self.sleep_or_stop(self.config.tick_interval).await {
                    break;
                }
            }
        }

        self.shutdown().await;
    }

    /// Run a single tick.
    pub async fn tick(&mut self) -> Result<TickOutcome, TickError> {
        let started = Instant::now();
        let result = self.evaluate(started).await;
        self.metrics
            .tick_duration
            .observe(started.elapsed().as_secs_f64());
        result
    }

    async fn evaluate(&mut self, started: Instant) -> Result<TickOutcome, TickError> {
        let now = self.clock.now()?;

        let view = LivenessView::observe(&self.probe, self.working.original()).await;
        self.metrics.reachable_nodes.set(view.alive_count() as i64);

        let outage = observe_outage(
            self.working.original(),
            &view,
            self.config.outage_threshold,
        );

        if outage.is_outage() && !outage.calls_for_pulse() && self.pulse.is_none() {
            debug!(%outage, "No node is reachable, staying on the chain");
        }

        if outage.calls_for_pulse() && self.pulse.is_none() {
            self.enter_pulse_mode(&view, outage, now).await?;
        } else if !outage.calls_for_pulse() && self.pulse.is_some() {
            self.exit_pulse_mode(outage);
        }

        if let Some(phase) = self.pulse.as_ref().map(|schedule| schedule.phase_at(now)) {
            match phase {
                PulsePhase::Active { remaining } => {
                    debug!(remaining = ?remaining, "Pulse active")
                }
                PulsePhase::Sleeping { next_in } => debug!(next_in = ?next_in, "Pulse sleeping"),
                PulsePhase::Abstaining => debug!("Abstaining from pulse mode"),
            }

            let active = matches!(phase, PulsePhase::Active { .. });
            self.transition(Role::from_master(active), &view, Cause::Pulse)
                .await?;

            return Ok(self.outcome());
        }

        let forced = self.shuffle_tx.send_replace(false);

        if forced || self.signal.is_under_attack() {
            let cause = if forced { Cause::Forced } else { Cause::Attack };
            self.shuffle(&view, now, cause);

            if self.role.is_master() {
                warn!("Handing over mastership");
                self.transition(Role::Standby, &view, cause).await?;
            }

            return Ok(self.outcome());
        }

        if self.working.held_for(self.config.shuffle_hold, now) {
            self.working.restore_original_chain(&mut self.me);
            self.set_mode(Mode::Normal);
        }

        let is_master = resolve_master(self.working.current(), &self.me, &view);
        self.signal.record_response_time(started.elapsed());

        self.transition(Role::from_master(is_master), &view, Cause::Chain)
            .await?;

        Ok(self.outcome())
    }

    async fn enter_pulse_mode(
        &mut self,
        view: &LivenessView,
        outage: MajorityOutage,
        now: Duration,
    ) -> Result<(), TickError> {
        warn!(%outage, "Majority of the chain is unreachable, entering pulse mode");

        if self.role.is_master() {
            self.transition(Role::Standby, view, Cause::PulseEntry)
                .await?;
        }

        let schedule = self
            .scheduler
            .schedule(self.working.original(), view, self.me.name(), now);

        warn!(
            order = %schedule.order.join(" → "),
            slot = ?schedule.my_slot,
            slots = schedule.total_slots(),
            pulse = ?schedule.pulse_duration,
            sleep = ?schedule.sleep_duration,
            "Pulse schedule"
        );

        self.pulse = Some(schedule);
        self.metrics.pulse_entries.inc();
        self.set_mode(Mode::Pulse);

        Ok(())
    }

    fn exit_pulse_mode(&mut self, outage: MajorityOutage) {
        if outage.is_outage() {
            warn!(%outage, "No node is reachable, leaving pulse mode");
        } else {
            info!(%outage, "Majority of the chain is reachable again, leaving pulse mode");
        }

        self.pulse = None;
        self.working.restore_original_chain(&mut self.me);
        self.set_mode(Mode::Normal);
    }

    fn shuffle(&mut self, view: &LivenessView, now: Duration, cause: Cause) {
        warn!(cause = cause.as_str(), "Shuffling the chain");

        if let Some(shuffled) = self.shuffler.shuffle(self.working.original(), view, now) {
            if self.working.install_shuffle(shuffled, now, &mut self.me) {
                warn!(
                    chain = %self.working.current(),
                    position = %self.me.position(),
                    "Installed shuffled chain"
                );

                self.metrics.shuffles.inc();
                self.set_mode(Mode::Shuffle);
            }
        }

        self.signal.reset();
    }

    async fn transition(
        &mut self,
        target: Role,
        view: &LivenessView,
        cause: Cause,
    ) -> Result<(), TickError> {
        if target == self.role {
            debug!(role = %self.role, "Role unchanged");
            return Ok(());
        }

        self.role = target;
        self.metrics.set_role(target);
        self.metrics.role_transitions.inc();

        let status = chain_status(self.working.current(), &self.me, view);

        match target {
            Role::Master => {
                self.term += 1;
                self.signal.record_success();

                info!(term = self.term, cause = cause.as_str(), "→ MASTER");
                info!(%status, "Chain");

                self.handler
                    .on_become_master(self.term)
                    .await
                    .map_err(|report| TickError::Handler {
                        transition: "become master",
                        report,
                    })
            }
            Role::Standby => {
                info!(cause = cause.as_str(), "→ STANDBY");
                info!(%status, "Chain");

                self.handler
                    .on_become_standby()
                    .await
                    .map_err(|report| TickError::Handler {
                        transition: "become standby",
                        report,
                    })
            }
        }
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            warn!(from = %self.mode, to = %mode, "Mode changed");
            self.mode = mode;
            self.metrics.set_mode(mode);
        }
    }

    fn outcome(&self) -> TickOutcome {
        TickOutcome {
            role: self.role,
            mode: self.mode,
        }
    }

    async fn start_listener(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            if let Err(e) = listener.start().await {
                warn!("{e}, continuing in probe-only mode");
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.role.is_master() {
            let view = LivenessView::default();

            if let Err(e) = self.transition(Role::Standby, &view, Cause::Shutdown).await {
                error!("Failed to step down: {e}");
            }
        }

        if let Some(listener) = self.listener.as_mut() {
            listener.stop();
        }

        info!("Leader election loop stopped");
    }

    /// Sleep for `duration`, or less if stopped. Returns whether it was stopped.
    async fn sleep_or_stop(&mut self, duration: Duration) -> bool {
        if *self.stop_rx.borrow() {
            return true;
        }

        let stopped = tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.stop_rx.changed() => true,
        };

        stopped || *self.stop_rx.borrow()
    }
}
