use serde::{Deserialize, Serialize};

/// OSC address prefix shared by every parameter the engine speaks.
pub const ADDRESS_PREFIX: &str = "/avatar/parameters/";

/// The tracked parameter namespace. Hour and minute travel as normalized
/// floats in [0, 1]; the rest are booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Param {
    /// Alarm hour, bidirectional. Wire value is `hour / 23.0`.
    SetHour,
    /// Alarm minute, bidirectional. Wire value is `minute / 59.0`.
    SetMinute,
    /// Alarm enabled flag, bidirectional.
    IsOn,
    /// Snooze button, inbound only. Rising edge triggers a snooze request.
    SnoozePressed,
    /// Stop button, inbound only. Rising edge triggers a stop request.
    StopPressed,
    /// Bell signal, outbound only. Mirrors the ringing phase.
    ShouldFire,
}

impl Param {
    pub fn address(self) -> &'static str {
        match self {
            Param::SetHour => "/avatar/parameters/AlarmSetHour",
            Param::SetMinute => "/avatar/parameters/AlarmSetMinute",
            Param::IsOn => "/avatar/parameters/AlarmIsOn",
            Param::SnoozePressed => "/avatar/parameters/SnoozePressed",
            Param::StopPressed => "/avatar/parameters/StopPressed",
            Param::ShouldFire => "/avatar/parameters/AlarmShouldFire",
        }
    }

    /// Reverse lookup. The peer broadcasts its whole parameter set on the
    /// same port, so unknown addresses are the common case, not an error.
    pub fn from_address(addr: &str) -> Option<Self> {
        match addr {
            "/avatar/parameters/AlarmSetHour" => Some(Param::SetHour),
            "/avatar/parameters/AlarmSetMinute" => Some(Param::SetMinute),
            "/avatar/parameters/AlarmIsOn" => Some(Param::IsOn),
            "/avatar/parameters/SnoozePressed" => Some(Param::SnoozePressed),
            "/avatar/parameters/StopPressed" => Some(Param::StopPressed),
            "/avatar/parameters/AlarmShouldFire" => Some(Param::ShouldFire),
            _ => None,
        }
    }

    /// Parameters the remote peer may write. `ShouldFire` is ours alone.
    pub fn is_inbound(self) -> bool {
        !matches!(self, Param::ShouldFire)
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address())
    }
}

/// A single typed OSC argument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
}

/// One decoded parameter write received from the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamUpdate {
    pub param: Param,
    pub value: ParamValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_roundtrip() {
        for param in [
            Param::SetHour,
            Param::SetMinute,
            Param::IsOn,
            Param::SnoozePressed,
            Param::StopPressed,
            Param::ShouldFire,
        ] {
            assert_eq!(Param::from_address(param.address()), Some(param));
        }
    }

    #[test]
    fn unknown_address_is_none() {
        assert_eq!(Param::from_address("/avatar/parameters/VelocityX"), None);
        assert_eq!(Param::from_address(""), None);
    }

    #[test]
    fn should_fire_is_outbound_only() {
        assert!(!Param::ShouldFire.is_inbound());
        assert!(Param::SetHour.is_inbound());
        assert!(Param::SnoozePressed.is_inbound());
    }
}
