//! The engine actor: single owner of the alarm settings and runtime state.
//!
//! Three independent trigger sources — inbound datagrams, wall-clock
//! deadlines, facade calls from the shell — all land in one thread that
//! owns the state exclusively. The UDP receive thread only decodes and
//! forwards; outbound sends are fire-and-forget and repaired by the
//! heartbeat. Deadlines are plain data re-checked against the wall clock
//! at least once per idle tick, so a clock jump (system sleep/resume)
//! fires an overdue alarm immediately instead of waiting out a stale
//! timeout.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use crossbeam_channel::{bounded, never, select, unbounded, Receiver, Sender};
use log::{error, info, warn};

use oscalarm_net::{mapper, OscSink};
use oscalarm_types::{
    AlarmPhase, AlarmSettings, Connection, Param, ParamUpdate, ParamValue, RuntimeSnapshot,
    TimerPolicy, ValidationError,
};

use crate::config::Store;
use crate::machine::{AlarmMachine, DeadlineKind, Effect, MachineEvent};
use crate::sync::{full_bundle, InboundEffect, SyncCoordinator};

/// The engine's wall-clock source. Deadlines and the heartbeat schedule
/// both read it, so tests can drive scheduling by advancing a fake clock
/// instead of waiting out real minutes.
pub type Clock = Arc<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Timing the engine runs with. Tests shrink these to milliseconds;
/// production uses the defaults.
#[derive(Clone)]
pub struct EngineConfig {
    /// Period of the unconditional full-state heartbeat.
    pub heartbeat_period: Duration,
    /// The peer counts as connected while the last received datagram is
    /// younger than this.
    pub liveness_window: Duration,
    /// Upper bound on how long the loop sleeps between wall-clock checks.
    pub idle_tick: Duration,
    /// Wall-clock source for deadlines and the heartbeat schedule.
    pub clock: Clock,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heartbeat_period: Duration::from_secs(30),
            liveness_window: Duration::from_secs(60),
            idle_tick: Duration::from_secs(1),
            clock: Arc::new(Local::now),
        }
    }
}

/// Why a settings edit did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetSettingsError {
    /// The edit was rejected by validation; state is unchanged.
    Invalid(ValidationError),
    /// The engine thread has already shut down.
    Stopped,
}

impl std::fmt::Display for SetSettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetSettingsError::Invalid(e) => write!(f, "{}", e),
            SetSettingsError::Stopped => write!(f, "engine has shut down"),
        }
    }
}

impl std::error::Error for SetSettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetSettingsError::Invalid(e) => Some(e),
            SetSettingsError::Stopped => None,
        }
    }
}

/// Notifications pushed to subscribers on every mutation, so a shell can
/// refresh without waiting for its next poll.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Settings changed, locally or by validated remote input.
    SettingsChanged(AlarmSettings),
    PhaseChanged(AlarmPhase),
    /// A save failed; the engine continues on its in-memory copy.
    PersistenceFailed(String),
}

enum EngineMsg {
    SetSettings(AlarmSettings, Sender<Result<(), ValidationError>>),
    SetPolicy(TimerPolicy),
    Snooze,
    Stop,
    Snapshot(Sender<RuntimeSnapshot>),
    Settings(Sender<AlarmSettings>),
    Policy(Sender<TimerPolicy>),
    Subscribe(Sender<EngineEvent>),
    Shutdown,
}

/// Cloneable facade over the engine mailbox. All mutators and readers
/// serialize through the owning thread; readers get bounded-time snapshot
/// copies and never touch live state.
#[derive(Clone)]
pub struct EngineHandle {
    tx: Sender<EngineMsg>,
}

impl EngineHandle {
    pub fn snapshot(&self) -> RuntimeSnapshot {
        let (reply_tx, reply_rx) = bounded(1);
        if self.tx.send(EngineMsg::Snapshot(reply_tx)).is_ok() {
            if let Ok(snap) = reply_rx.recv() {
                return snap;
            }
        }
        // Engine already shut down; report rest state.
        RuntimeSnapshot::at_rest()
    }

    pub fn settings(&self) -> AlarmSettings {
        let (reply_tx, reply_rx) = bounded(1);
        if self.tx.send(EngineMsg::Settings(reply_tx)).is_ok() {
            if let Ok(settings) = reply_rx.recv() {
                return settings;
            }
        }
        AlarmSettings::default()
    }

    pub fn policy(&self) -> TimerPolicy {
        let (reply_tx, reply_rx) = bounded(1);
        if self.tx.send(EngineMsg::Policy(reply_tx)).is_ok() {
            if let Ok(policy) = reply_rx.recv() {
                return policy;
            }
        }
        TimerPolicy::default()
    }

    /// Replace the alarm settings. Rejects out-of-range values instead of
    /// clamping: a local edit is deliberate and deserves the error. An edit
    /// against an already stopped engine is an error too, never a silent
    /// success.
    pub fn set_settings(&self, settings: AlarmSettings) -> Result<(), SetSettingsError> {
        let (reply_tx, reply_rx) = bounded(1);
        if self.tx.send(EngineMsg::SetSettings(settings, reply_tx)).is_err() {
            error!("engine is gone; settings not applied");
            return Err(SetSettingsError::Stopped);
        }
        match reply_rx.recv() {
            Ok(result) => result.map_err(SetSettingsError::Invalid),
            Err(_) => Err(SetSettingsError::Stopped),
        }
    }

    /// Replace the timer policy (clamped into legal ranges). Takes effect
    /// on the next phase transition.
    pub fn set_policy(&self, policy: TimerPolicy) {
        let _ = self.tx.send(EngineMsg::SetPolicy(policy.normalized()));
    }

    pub fn request_snooze(&self) {
        let _ = self.tx.send(EngineMsg::Snooze);
    }

    pub fn request_stop(&self) {
        let _ = self.tx.send(EngineMsg::Stop);
    }

    /// Register for change notifications. The receiver sees every settings
    /// and phase mutation from registration onward.
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        let (tx, rx) = unbounded();
        let _ = self.tx.send(EngineMsg::Subscribe(tx));
        rx
    }
}

/// Owning handle for the engine thread.
pub struct Engine {
    handle: EngineHandle,
    thread: Option<JoinHandle<()>>,
}

impl Engine {
    /// Spawn the engine thread. `inbound` carries decoded updates from the
    /// UDP link; `sink` is the outbound half (the link itself in
    /// production). The startup bundle is pushed before the first message
    /// is processed.
    pub fn spawn(
        settings: AlarmSettings,
        policy: TimerPolicy,
        store: Store,
        sink: impl OscSink,
        inbound: Receiver<ParamUpdate>,
        config: EngineConfig,
    ) -> Engine {
        let (tx, rx) = unbounded();
        let thread = thread::spawn(move || {
            run_engine(settings, policy, store, sink, inbound, rx, config);
        });
        Engine {
            handle: EngineHandle { tx },
            thread: Some(thread),
        }
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Stop the engine thread and wait for it.
    pub fn shutdown(mut self) {
        let _ = self.handle.tx.send(EngineMsg::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.handle.tx.send(EngineMsg::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct EngineState<S: OscSink> {
    settings: AlarmSettings,
    policy: TimerPolicy,
    machine: AlarmMachine,
    coordinator: SyncCoordinator,
    /// The single live machine deadline; overwritten, never stacked.
    deadline: Option<(DeadlineKind, DateTime<Local>)>,
    /// Heartbeat schedule on the same clock as the deadlines, so a clock
    /// jump (system sleep/resume) triggers an immediate re-send rather
    /// than waiting out a full period.
    next_heartbeat: DateTime<Local>,
    heartbeat_period: ChronoDuration,
    last_received_at: Option<DateTime<Utc>>,
    last_sent_at: Option<DateTime<Utc>>,
    subscribers: Vec<Sender<EngineEvent>>,
    store: Store,
    sink: S,
    config: EngineConfig,
}

fn run_engine<S: OscSink>(
    settings: AlarmSettings,
    policy: TimerPolicy,
    store: Store,
    sink: S,
    inbound: Receiver<ParamUpdate>,
    mailbox: Receiver<EngineMsg>,
    config: EngineConfig,
) {
    let now = (config.clock)();
    let (machine, initial_effects) = AlarmMachine::new(&settings, now);
    let heartbeat_period = ChronoDuration::from_std(config.heartbeat_period)
        .unwrap_or_else(|_| ChronoDuration::days(365));
    let mut state = EngineState {
        settings,
        policy: policy.normalized(),
        machine,
        coordinator: SyncCoordinator::new(),
        deadline: None,
        next_heartbeat: now + heartbeat_period,
        heartbeat_period,
        last_received_at: None,
        last_sent_at: None,
        subscribers: Vec::new(),
        store,
        sink,
        config,
    };
    state.apply_effects(initial_effects);
    // Startup push: converge a peer that is already in-world before the
    // first heartbeat period elapses.
    state.send_heartbeat();
    info!(
        "engine started: {:02}:{:02} enabled={} phase={}",
        state.settings.hour,
        state.settings.minute,
        state.settings.enabled,
        state.machine.phase()
    );

    let mut inbound = inbound;
    loop {
        state.poll_deadlines();
        let timeout = state.next_timeout();

        select! {
            recv(mailbox) -> msg => match msg {
                Ok(EngineMsg::Shutdown) | Err(_) => break,
                Ok(msg) => state.handle_msg(msg),
            },
            recv(inbound) -> update => match update {
                Ok(update) => state.handle_inbound(update),
                Err(_) => {
                    // Link is gone; keep ticking the scheduler regardless.
                    warn!("inbound channel closed; continuing without receive");
                    inbound = never();
                }
            },
            default(timeout) => {}
        }
    }
    info!("engine stopped");
}

impl<S: OscSink> EngineState<S> {
    fn handle_msg(&mut self, msg: EngineMsg) {
        match msg {
            EngineMsg::SetSettings(new, reply) => {
                let _ = reply.send(self.handle_set_settings(new));
            }
            EngineMsg::SetPolicy(policy) => {
                if self.policy != policy {
                    self.policy = policy;
                    self.persist();
                }
            }
            EngineMsg::Snooze => {
                let fx = self.step(MachineEvent::SnoozeRequested);
                self.apply_effects(fx);
            }
            EngineMsg::Stop => {
                let fx = self.step(MachineEvent::StopRequested);
                self.apply_effects(fx);
            }
            EngineMsg::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            EngineMsg::Settings(reply) => {
                let _ = reply.send(self.settings);
            }
            EngineMsg::Policy(reply) => {
                let _ = reply.send(self.policy);
            }
            EngineMsg::Subscribe(tx) => {
                self.subscribers.push(tx);
            }
            // Intercepted by the loop before dispatch.
            EngineMsg::Shutdown => {}
        }
    }

    fn handle_set_settings(&mut self, new: AlarmSettings) -> Result<(), ValidationError> {
        new.validate()?;
        let old = self.settings;
        if old == new {
            return Ok(());
        }
        self.settings = new;

        // Push the affected parameters immediately; the heartbeat would
        // get there eventually, but the peer should see a local edit now.
        if new.hour != old.hour {
            self.send_param(Param::SetHour, ParamValue::Float(mapper::hour_to_wire(new.hour)));
        }
        if new.minute != old.minute {
            self.send_param(
                Param::SetMinute,
                ParamValue::Float(mapper::minute_to_wire(new.minute)),
            );
        }
        if new.enabled != old.enabled {
            self.send_param(Param::IsOn, ParamValue::Bool(new.enabled));
            let fx = self.step(MachineEvent::EnabledChanged(new.enabled));
            self.apply_effects(fx);
        } else if (new.hour, new.minute) != (old.hour, old.minute) {
            let fx = self.step(MachineEvent::TimeChanged);
            self.apply_effects(fx);
        }

        self.persist();
        self.emit(EngineEvent::SettingsChanged(new));
        Ok(())
    }

    fn handle_inbound(&mut self, update: ParamUpdate) {
        self.last_received_at = Some(Utc::now());
        let effects = self.coordinator.apply_inbound(update, &mut self.settings);
        let mut settings_changed = false;
        for effect in effects {
            match effect {
                InboundEffect::Echo(param, wire) => {
                    self.send_param(param, ParamValue::Float(wire));
                }
                InboundEffect::HourChanged | InboundEffect::MinuteChanged => {
                    settings_changed = true;
                    let fx = self.step(MachineEvent::TimeChanged);
                    self.apply_effects(fx);
                }
                InboundEffect::EnabledChanged(enabled) => {
                    settings_changed = true;
                    let fx = self.step(MachineEvent::EnabledChanged(enabled));
                    self.apply_effects(fx);
                }
                InboundEffect::SnoozeEdge => {
                    let fx = self.step(MachineEvent::SnoozeRequested);
                    self.apply_effects(fx);
                }
                InboundEffect::StopEdge => {
                    let fx = self.step(MachineEvent::StopRequested);
                    self.apply_effects(fx);
                }
            }
        }
        if settings_changed {
            self.persist();
            self.emit(EngineEvent::SettingsChanged(self.settings));
        }
    }

    /// Fire any deadline the wall clock has passed, then the heartbeat.
    fn poll_deadlines(&mut self) {
        let now = (self.config.clock)();
        if let Some((kind, at)) = self.deadline {
            if now >= at {
                self.deadline = None;
                info!("deadline {:?} reached", kind);
                let event = match kind {
                    DeadlineKind::Fire => MachineEvent::FireDue,
                    DeadlineKind::SnoozeWake => MachineEvent::SnoozeWakeDue,
                    DeadlineKind::RingingTimeout => MachineEvent::RingingTimeout,
                };
                let fx = self.step(event);
                self.apply_effects(fx);
            }
        }
        if now >= self.next_heartbeat {
            self.send_heartbeat();
            self.next_heartbeat = now + self.heartbeat_period;
        }
    }

    /// How long the loop may sleep: until the nearest deadline or
    /// heartbeat, capped by the idle tick so wall-clock jumps are noticed.
    fn next_timeout(&self) -> Duration {
        let now = (self.config.clock)();
        let mut timeout = self.config.idle_tick;
        if let Some((_, at)) = self.deadline {
            timeout = timeout.min((at - now).to_std().unwrap_or(Duration::ZERO));
        }
        timeout.min((self.next_heartbeat - now).to_std().unwrap_or(Duration::ZERO))
    }

    fn step(&mut self, event: MachineEvent) -> Vec<Effect> {
        let now = (self.config.clock)();
        self.machine.step(event, &self.settings, &self.policy, now)
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SendShouldFire(v) => {
                    self.send_param(Param::ShouldFire, ParamValue::Bool(v));
                }
                Effect::ArmDeadline(kind, at) => {
                    self.deadline = Some((kind, at));
                    info!("armed {:?} for {}", kind, at.format("%Y-%m-%d %H:%M:%S"));
                }
                Effect::Disarm => {
                    self.deadline = None;
                }
                Effect::PhaseChanged(phase) => {
                    info!("phase -> {}", phase);
                    self.emit(EngineEvent::PhaseChanged(phase));
                }
            }
        }
    }

    fn send_param(&mut self, param: Param, value: ParamValue) {
        match self.sink.send_param(param, value) {
            Ok(()) => self.last_sent_at = Some(Utc::now()),
            // Not fatal: the next heartbeat doubles as the retry.
            Err(e) => warn!("send of {} failed: {}", param, e),
        }
    }

    fn send_heartbeat(&mut self) {
        let bundle = full_bundle(&self.settings, self.machine.phase());
        match self.sink.send_bundle(&bundle) {
            Ok(()) => self.last_sent_at = Some(Utc::now()),
            Err(e) => warn!("heartbeat failed: {}", e),
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.settings, &self.policy) {
            warn!("could not persist settings: {}", e);
            self.emit(EngineEvent::PersistenceFailed(e.to_string()));
        }
    }

    fn emit(&mut self, event: EngineEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn snapshot(&self) -> RuntimeSnapshot {
        let connected = self
            .last_received_at
            .map(|t| {
                Utc::now()
                    .signed_duration_since(t)
                    .to_std()
                    .map(|age| age < self.config.liveness_window)
                    .unwrap_or(false)
            })
            .unwrap_or(false);
        let next_fire_at = self.deadline.and_then(|(kind, at)| match kind {
            DeadlineKind::Fire | DeadlineKind::SnoozeWake => Some(at),
            DeadlineKind::RingingTimeout => None,
        });
        RuntimeSnapshot {
            connection: if connected {
                Connection::Connected
            } else {
                Connection::Disconnected
            },
            phase: self.machine.phase(),
            snooze_count: self.machine.snooze_count(),
            last_received_at: self.last_received_at,
            last_sent_at: self.last_sent_at,
            next_fire_at,
        }
    }
}
