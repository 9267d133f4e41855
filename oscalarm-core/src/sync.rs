//! Parameter reconciliation between the engine's authoritative state and
//! the unreliable inbound stream.
//!
//! Inbound updates are last-write-wins per field; there is a single peer,
//! so no ordering metadata is kept. When the mapper had to clamp a value,
//! the corrected encoding is echoed straight back so both ends converge
//! even if the peer keeps an out-of-range float. Button parameters are
//! rising-edge triggered so a held or re-sent `true` cannot double-fire.

use log::{debug, warn};

use oscalarm_net::mapper;
use oscalarm_types::{AlarmPhase, AlarmSettings, Param, ParamUpdate, ParamValue};

/// What an inbound parameter update asks the engine to do, beyond the
/// field write itself (which `apply_inbound` performs in place).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InboundEffect {
    /// The alarm time changed; persist, notify, and re-plan the deadline.
    HourChanged,
    MinuteChanged,
    /// The enabled flag changed; carries the new value.
    EnabledChanged(bool),
    /// The mapper corrected an out-of-range wire value; echo the canonical
    /// encoding back to the peer.
    Echo(Param, f32),
    /// Rising edge on the snooze button.
    SnoozeEdge,
    /// Rising edge on the stop button.
    StopEdge,
}

/// Tracks the last seen button levels for edge detection.
#[derive(Debug, Default)]
pub struct SyncCoordinator {
    snooze_pressed: bool,
    stop_pressed: bool,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one decoded update to the settings, last-write-wins. Returns
    /// the follow-up work for the engine in order. A type mismatch on a
    /// known address is dropped with a warning; the peer's next heartbeat
    /// of ours will re-align it.
    pub fn apply_inbound(
        &mut self,
        update: ParamUpdate,
        settings: &mut AlarmSettings,
    ) -> Vec<InboundEffect> {
        let mut effects = Vec::new();
        match (update.param, update.value) {
            (Param::SetHour, ParamValue::Float(wire)) => {
                let hour = mapper::wire_to_hour(wire);
                let canonical = mapper::hour_to_wire(hour);
                if mapper::needs_echo(wire, canonical) {
                    debug!("clamping AlarmSetHour {} -> {} ({}h)", wire, canonical, hour);
                    effects.push(InboundEffect::Echo(Param::SetHour, canonical));
                }
                if settings.hour != hour {
                    settings.hour = hour;
                    effects.push(InboundEffect::HourChanged);
                }
            }
            (Param::SetMinute, ParamValue::Float(wire)) => {
                let minute = mapper::wire_to_minute(wire);
                let canonical = mapper::minute_to_wire(minute);
                if mapper::needs_echo(wire, canonical) {
                    debug!(
                        "clamping AlarmSetMinute {} -> {} ({}m)",
                        wire, canonical, minute
                    );
                    effects.push(InboundEffect::Echo(Param::SetMinute, canonical));
                }
                if settings.minute != minute {
                    settings.minute = minute;
                    effects.push(InboundEffect::MinuteChanged);
                }
            }
            (Param::IsOn, ParamValue::Bool(enabled)) => {
                if settings.enabled != enabled {
                    settings.enabled = enabled;
                    effects.push(InboundEffect::EnabledChanged(enabled));
                }
            }
            (Param::SnoozePressed, ParamValue::Bool(pressed)) => {
                let rising = pressed && !self.snooze_pressed;
                self.snooze_pressed = pressed;
                if rising {
                    effects.push(InboundEffect::SnoozeEdge);
                }
            }
            (Param::StopPressed, ParamValue::Bool(pressed)) => {
                let rising = pressed && !self.stop_pressed;
                self.stop_pressed = pressed;
                if rising {
                    effects.push(InboundEffect::StopEdge);
                }
            }
            (param, value) => {
                warn!("type mismatch for {}: {:?}", param, value);
            }
        }
        effects
    }
}

/// The full parameter bundle for the periodic heartbeat and the startup
/// push: every tracked parameter, unconditionally, so a peer that joins or
/// resets mid-session converges without a delta history.
pub fn full_bundle(settings: &AlarmSettings, phase: AlarmPhase) -> Vec<(Param, ParamValue)> {
    vec![
        (
            Param::SetHour,
            ParamValue::Float(mapper::hour_to_wire(settings.hour)),
        ),
        (
            Param::SetMinute,
            ParamValue::Float(mapper::minute_to_wire(settings.minute)),
        ),
        (Param::IsOn, ParamValue::Bool(settings.enabled)),
        (Param::ShouldFire, ParamValue::Bool(phase.should_fire())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(param: Param, value: ParamValue) -> ParamUpdate {
        ParamUpdate { param, value }
    }

    #[test]
    fn in_range_hour_applies_without_echo() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings::default();
        let effects = sync.apply_inbound(
            update(Param::SetHour, ParamValue::Float(mapper::hour_to_wire(9))),
            &mut settings,
        );
        assert_eq!(settings.hour, 9);
        assert_eq!(effects, vec![InboundEffect::HourChanged]);
    }

    #[test]
    fn out_of_range_hour_clamps_and_echoes() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings::default();
        let effects = sync.apply_inbound(
            update(Param::SetHour, ParamValue::Float(1.5)),
            &mut settings,
        );
        assert_eq!(settings.hour, 23);
        assert_eq!(
            effects,
            vec![
                InboundEffect::Echo(Param::SetHour, 1.0),
                InboundEffect::HourChanged,
            ]
        );
    }

    #[test]
    fn negative_minute_clamps_to_zero() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings {
            minute: 30,
            ..AlarmSettings::default()
        };
        let effects = sync.apply_inbound(
            update(Param::SetMinute, ParamValue::Float(-0.1)),
            &mut settings,
        );
        assert_eq!(settings.minute, 0);
        assert!(effects.contains(&InboundEffect::Echo(Param::SetMinute, 0.0)));
    }

    #[test]
    fn unchanged_value_produces_no_change_effect() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings::default(); // hour 7
        let effects = sync.apply_inbound(
            update(Param::SetHour, ParamValue::Float(mapper::hour_to_wire(7))),
            &mut settings,
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn enabled_toggle_is_reported_once() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings::default();
        let effects = sync.apply_inbound(update(Param::IsOn, ParamValue::Bool(true)), &mut settings);
        assert_eq!(effects, vec![InboundEffect::EnabledChanged(true)]);
        assert!(settings.enabled);

        // Duplicate delivery of the same value is absorbed.
        let effects = sync.apply_inbound(update(Param::IsOn, ParamValue::Bool(true)), &mut settings);
        assert!(effects.is_empty());
    }

    #[test]
    fn buttons_trigger_on_rising_edge_only() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings::default();

        let effects =
            sync.apply_inbound(update(Param::SnoozePressed, ParamValue::Bool(true)), &mut settings);
        assert_eq!(effects, vec![InboundEffect::SnoozeEdge]);

        // Held down / duplicated true: no second trigger.
        let effects =
            sync.apply_inbound(update(Param::SnoozePressed, ParamValue::Bool(true)), &mut settings);
        assert!(effects.is_empty());

        // Release then press again: triggers once more.
        sync.apply_inbound(update(Param::SnoozePressed, ParamValue::Bool(false)), &mut settings);
        let effects =
            sync.apply_inbound(update(Param::SnoozePressed, ParamValue::Bool(true)), &mut settings);
        assert_eq!(effects, vec![InboundEffect::SnoozeEdge]);
    }

    #[test]
    fn type_mismatch_is_dropped() {
        let mut sync = SyncCoordinator::new();
        let mut settings = AlarmSettings::default();
        let effects =
            sync.apply_inbound(update(Param::SetHour, ParamValue::Bool(true)), &mut settings);
        assert!(effects.is_empty());
        assert_eq!(settings.hour, 7);
    }

    #[test]
    fn full_bundle_covers_every_tracked_param() {
        let settings = AlarmSettings {
            hour: 23,
            minute: 59,
            enabled: true,
        };
        let bundle = full_bundle(&settings, AlarmPhase::Ringing);
        assert_eq!(
            bundle,
            vec![
                (Param::SetHour, ParamValue::Float(1.0)),
                (Param::SetMinute, ParamValue::Float(1.0)),
                (Param::IsOn, ParamValue::Bool(true)),
                (Param::ShouldFire, ParamValue::Bool(true)),
            ]
        );

        let bundle = full_bundle(&settings, AlarmPhase::Snoozed);
        assert_eq!(bundle[3], (Param::ShouldFire, ParamValue::Bool(false)));
    }
}
