//! # oscalarm-types
//!
//! Shared type definitions for the oscalarm workspace: alarm settings and
//! timer policy, the runtime phase model, the OSC parameter namespace, and
//! the error taxonomy used by both oscalarm-net and oscalarm-core.

mod error;
mod param;
mod phase;
mod settings;
mod snapshot;

pub use error::{DecodeError, PersistenceError, ValidationError};
pub use param::{Param, ParamUpdate, ParamValue, ADDRESS_PREFIX};
pub use phase::{AlarmPhase, Connection};
pub use settings::{AlarmSettings, TimerPolicy};
pub use snapshot::RuntimeSnapshot;
