use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// User-facing alarm configuration. Always held in domain units
/// (hour 0-23, minute 0-59); wire normalization lives at the protocol
/// boundary and never persists. Updates are whole-struct snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSettings {
    pub hour: u32,
    pub minute: u32,
    pub enabled: bool,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            hour: 7,
            minute: 0,
            enabled: false,
        }
    }
}

impl AlarmSettings {
    /// Range-check a deliberate local edit. Remote input is clamped at the
    /// mapper instead; this is the one path that rejects.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hour > 23 {
            return Err(ValidationError::OutOfRange {
                field: "hour",
                value: self.hour,
                max: 23,
            });
        }
        if self.minute > 59 {
            return Err(ValidationError::OutOfRange {
                field: "minute",
                value: self.minute,
                max: 59,
            });
        }
        Ok(())
    }
}

/// Snooze and ringing limits consulted on phase transitions. Changes take
/// effect on the next transition, never retroactively mid-ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerPolicy {
    pub max_snoozes: u32,
    pub ringing_duration_minutes: u32,
    pub snooze_duration_minutes: u32,
}

impl Default for TimerPolicy {
    fn default() -> Self {
        Self {
            max_snoozes: 5,
            ringing_duration_minutes: 15,
            snooze_duration_minutes: 9,
        }
    }
}

impl TimerPolicy {
    /// Build a policy with every field clamped into its legal range
    /// (1-20 snoozes, 1-60 minutes ringing, 1-30 minutes snooze).
    pub fn clamped(
        max_snoozes: u32,
        ringing_duration_minutes: u32,
        snooze_duration_minutes: u32,
    ) -> Self {
        Self {
            max_snoozes: max_snoozes.clamp(1, 20),
            ringing_duration_minutes: ringing_duration_minutes.clamp(1, 60),
            snooze_duration_minutes: snooze_duration_minutes.clamp(1, 30),
        }
    }

    /// Re-clamp a policy that arrived from disk or a remote caller.
    pub fn normalized(self) -> Self {
        Self::clamped(
            self.max_snoozes,
            self.ringing_duration_minutes,
            self.snooze_duration_minutes,
        )
    }
}
