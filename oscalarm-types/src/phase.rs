use serde::{Deserialize, Serialize};

/// The alarm's current mode. Exactly one phase is active at any instant;
/// `Off` overrides any in-progress phase the moment the alarm is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmPhase {
    Off,
    Waiting,
    Ringing,
    Snoozed,
    Stopped,
}

impl AlarmPhase {
    /// Whether the remote bell parameter should currently be raised.
    /// Snoozed counts as silent.
    pub fn should_fire(self) -> bool {
        matches!(self, AlarmPhase::Ringing)
    }
}

impl std::fmt::Display for AlarmPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AlarmPhase::Off => "off",
            AlarmPhase::Waiting => "waiting",
            AlarmPhase::Ringing => "ringing",
            AlarmPhase::Snoozed => "snoozed",
            AlarmPhase::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// Peer liveness, derived from the age of the last received datagram at
/// snapshot time. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connection {
    Connected,
    Disconnected,
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connection::Connected => write!(f, "connected"),
            Connection::Disconnected => write!(f, "disconnected"),
        }
    }
}
