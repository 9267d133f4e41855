//! Pure wire/domain conversions for the normalized float parameters.
//!
//! The remote side represents hour and minute as floats in [0, 1]. Domain
//! values live in 0-23 / 0-59 everywhere else. Out-of-range wire input is
//! clamped, never rejected; the caller echoes the corrected encoding back
//! so both ends converge.

/// Difference above which a received float is treated as disagreeing with
/// its canonical re-encoding and gets echoed back.
pub const WIRE_EPSILON: f32 = 1e-3;

pub fn hour_to_wire(hour: u32) -> f32 {
    hour.min(23) as f32 / 23.0
}

pub fn wire_to_hour(value: f32) -> u32 {
    (value * 23.0).round().clamp(0.0, 23.0) as u32
}

pub fn minute_to_wire(minute: u32) -> f32 {
    minute.min(59) as f32 / 59.0
}

pub fn wire_to_minute(value: f32) -> u32 {
    (value * 59.0).round().clamp(0.0, 59.0) as u32
}

/// Whether a received wire value differs enough from the canonical
/// encoding of its clamped domain value to warrant an echo.
pub fn needs_echo(received: f32, canonical: f32) -> bool {
    (received - canonical).abs() > WIRE_EPSILON
}
