//! # oscalarm-net
//!
//! Protocol boundary for the alarm engine: the OSC codec for the alarm
//! parameter namespace, the pure wire/domain parameter mapper, and the UDP
//! link that forwards decoded updates to the engine over a channel.

pub mod codec;
pub mod link;
pub mod mapper;

pub use link::{OscLink, OscSink};
