use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use crate::phase::{AlarmPhase, Connection};

/// Read-only copy of the engine's runtime state, handed to the shell on
/// every poll. A value, not a view: the engine retains exclusive ownership
/// of the live state.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeSnapshot {
    pub connection: Connection,
    pub phase: AlarmPhase,
    pub snooze_count: u32,
    pub last_received_at: Option<DateTime<Utc>>,
    pub last_sent_at: Option<DateTime<Utc>>,
    /// Next time the bell will ring (fire deadline or snooze wake), when
    /// one is armed.
    pub next_fire_at: Option<DateTime<Local>>,
}

impl RuntimeSnapshot {
    /// Every field at rest: what a freshly started (or already shut down)
    /// engine reports.
    pub fn at_rest() -> Self {
        Self {
            connection: Connection::Disconnected,
            phase: AlarmPhase::Off,
            snooze_count: 0,
            last_received_at: None,
            last_sent_at: None,
            next_fire_at: None,
        }
    }
}
