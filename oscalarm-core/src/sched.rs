//! Wall-clock deadline computation.
//!
//! All deadlines are plain `DateTime<Local>` values owned by the engine and
//! recomputed on every transition that supersedes them. The engine compares
//! them against the current wall clock on every tick, so a deadline that
//! slipped into the past (system sleep, clock jump) fires immediately.

use chrono::{DateTime, Duration, Local, Timelike};

/// Next occurrence of `hour:minute` on the local calendar: today if still
/// ahead of `now`, otherwise the same time tomorrow. Seconds are zeroed so
/// the alarm fires on the minute.
pub fn next_fire_time(now: DateTime<Local>, hour: u32, minute: u32) -> DateTime<Local> {
    let target = now
        .with_hour(hour)
        .and_then(|t| t.with_minute(minute))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    if now >= target {
        target + Duration::days(1)
    } else {
        target
    }
}

/// Snooze wake time: a fixed offset from now, independent of the original
/// alarm time.
pub fn snooze_wake_time(now: DateTime<Local>, snooze_duration_minutes: u32) -> DateTime<Local> {
    now + Duration::minutes(snooze_duration_minutes as i64)
}

/// When an unattended ring gives up.
pub fn ringing_timeout(now: DateTime<Local>, ringing_duration_minutes: u32) -> DateTime<Local> {
    now + Duration::minutes(ringing_duration_minutes as i64)
}
