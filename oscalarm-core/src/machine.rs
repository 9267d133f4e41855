//! Alarm phase state machine.
//!
//! Owns the canonical phase and snooze count and nothing else. Every
//! transition is expressed as `step(event, ..) -> Vec<Effect>`; the engine
//! loop executes the effects. Keeping I/O and deadline bookkeeping out of
//! this module makes the whole transition table unit-testable with an
//! injected clock. Duplicate triggers are no-ops, never errors.

use chrono::{DateTime, Local};

use oscalarm_types::{AlarmPhase, AlarmSettings, TimerPolicy};

use crate::sched;

/// Inputs that can move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    /// The enabled flag flipped (locally or remotely); carries the new value.
    EnabledChanged(bool),
    /// Alarm time changed while armed; the fire deadline must be recomputed.
    TimeChanged,
    /// The scheduled fire deadline was reached.
    FireDue,
    /// The snooze wake deadline was reached.
    SnoozeWakeDue,
    /// The ringing window elapsed with no input.
    RingingTimeout,
    /// Snooze requested, from the facade or a remote button edge.
    SnoozeRequested,
    /// Stop requested, from the facade or a remote button edge.
    StopRequested,
}

/// What the armed deadline means when it elapses. At most one of these is
/// live at a time; the heartbeat timer lives separately in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineKind {
    Fire,
    SnoozeWake,
    RingingTimeout,
}

/// Side effects the engine must carry out after a step, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Push the bell parameter outbound.
    SendShouldFire(bool),
    /// Arm (or re-arm) the single live deadline, superseding any previous one.
    ArmDeadline(DeadlineKind, DateTime<Local>),
    /// Drop any pending deadline.
    Disarm,
    /// The phase moved; subscribers should hear about it.
    PhaseChanged(AlarmPhase),
}

pub struct AlarmMachine {
    phase: AlarmPhase,
    snooze_count: u32,
}

impl AlarmMachine {
    /// Initial state at startup: `Off` when disabled, otherwise `Waiting`
    /// armed for the next occurrence of the configured time.
    pub fn new(settings: &AlarmSettings, now: DateTime<Local>) -> (Self, Vec<Effect>) {
        let mut machine = Self {
            phase: AlarmPhase::Off,
            snooze_count: 0,
        };
        let mut effects = Vec::new();
        if settings.enabled {
            machine.enter_waiting(settings, now, &mut effects);
        }
        (machine, effects)
    }

    pub fn phase(&self) -> AlarmPhase {
        self.phase
    }

    pub fn snooze_count(&self) -> u32 {
        self.snooze_count
    }

    /// Apply one event against the current settings and policy.
    pub fn step(
        &mut self,
        event: MachineEvent,
        settings: &AlarmSettings,
        policy: &TimerPolicy,
        now: DateTime<Local>,
    ) -> Vec<Effect> {
        let mut effects = Vec::new();
        match event {
            MachineEvent::EnabledChanged(false) => {
                if self.phase != AlarmPhase::Off {
                    self.phase = AlarmPhase::Off;
                    self.snooze_count = 0;
                    effects.push(Effect::Disarm);
                    effects.push(Effect::SendShouldFire(false));
                    effects.push(Effect::PhaseChanged(AlarmPhase::Off));
                }
            }
            MachineEvent::EnabledChanged(true) => {
                if self.phase == AlarmPhase::Off {
                    self.enter_waiting(settings, now, &mut effects);
                }
            }
            MachineEvent::TimeChanged => {
                // Only re-arms an already waiting alarm; a change landing
                // mid-ring or mid-snooze applies on the next transition.
                if self.phase == AlarmPhase::Waiting {
                    effects.push(Effect::ArmDeadline(
                        DeadlineKind::Fire,
                        sched::next_fire_time(now, settings.hour, settings.minute),
                    ));
                }
            }
            MachineEvent::FireDue => {
                if self.phase == AlarmPhase::Waiting {
                    self.enter_ringing(policy, now, &mut effects);
                }
            }
            MachineEvent::SnoozeWakeDue => {
                if self.phase == AlarmPhase::Snoozed {
                    self.enter_ringing(policy, now, &mut effects);
                }
            }
            MachineEvent::RingingTimeout => {
                if self.phase == AlarmPhase::Ringing {
                    self.enter_stopped(settings, now, &mut effects);
                }
            }
            MachineEvent::SnoozeRequested => {
                if self.phase == AlarmPhase::Ringing {
                    if self.snooze_count < policy.max_snoozes {
                        self.snooze_count += 1;
                        self.phase = AlarmPhase::Snoozed;
                        effects.push(Effect::SendShouldFire(false));
                        effects.push(Effect::ArmDeadline(
                            DeadlineKind::SnoozeWake,
                            sched::snooze_wake_time(now, policy.snooze_duration_minutes),
                        ));
                        effects.push(Effect::PhaseChanged(AlarmPhase::Snoozed));
                    } else {
                        // Snooze budget exhausted; the request stops the alarm.
                        self.enter_stopped(settings, now, &mut effects);
                    }
                }
            }
            MachineEvent::StopRequested => {
                if matches!(self.phase, AlarmPhase::Ringing | AlarmPhase::Snoozed) {
                    self.enter_stopped(settings, now, &mut effects);
                }
            }
        }
        effects
    }

    /// Arm for the next occurrence of the configured time. Resets the
    /// snooze count: Waiting is only ever entered from Off or Stopped.
    fn enter_waiting(
        &mut self,
        settings: &AlarmSettings,
        now: DateTime<Local>,
        effects: &mut Vec<Effect>,
    ) {
        self.phase = AlarmPhase::Waiting;
        self.snooze_count = 0;
        effects.push(Effect::ArmDeadline(
            DeadlineKind::Fire,
            sched::next_fire_time(now, settings.hour, settings.minute),
        ));
        effects.push(Effect::PhaseChanged(AlarmPhase::Waiting));
    }

    fn enter_ringing(
        &mut self,
        policy: &TimerPolicy,
        now: DateTime<Local>,
        effects: &mut Vec<Effect>,
    ) {
        self.phase = AlarmPhase::Ringing;
        effects.push(Effect::SendShouldFire(true));
        effects.push(Effect::ArmDeadline(
            DeadlineKind::RingingTimeout,
            sched::ringing_timeout(now, policy.ringing_duration_minutes),
        ));
        effects.push(Effect::PhaseChanged(AlarmPhase::Ringing));
    }

    /// Stopped is transient: it silences the bell, then immediately re-arms
    /// Waiting for the following day.
    fn enter_stopped(
        &mut self,
        settings: &AlarmSettings,
        now: DateTime<Local>,
        effects: &mut Vec<Effect>,
    ) {
        self.phase = AlarmPhase::Stopped;
        effects.push(Effect::SendShouldFire(false));
        effects.push(Effect::PhaseChanged(AlarmPhase::Stopped));
        self.enter_waiting(settings, now, effects);
    }
}
