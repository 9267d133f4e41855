//! # oscalarm-core
//!
//! The alarm engine, independent of any UI: the phase state machine,
//! wall-clock scheduling, parameter sync against the remote peer, TOML
//! settings persistence, and the `EngineHandle` facade a shell consumes.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use crossbeam_channel::unbounded;
//! use oscalarm_core::{config::Store, Engine, EngineConfig};
//! use oscalarm_net::OscLink;
//!
//! let store = Store::at_default_path();
//! let (settings, policy) = store.load();
//!
//! let (inbound_tx, inbound_rx) = unbounded();
//! let link = OscLink::open("127.0.0.1:9001", "127.0.0.1:9000", inbound_tx)?;
//!
//! let engine = Engine::spawn(settings, policy, store, link, inbound_rx, EngineConfig::default());
//! let handle = engine.handle();
//!
//! // Poll snapshots, mutate settings, subscribe to change events:
//! let snap = handle.snapshot();
//! handle.request_stop();
//! ```
//!
//! ## Module overview
//!
//! - [`machine`] — the alarm phase state machine as pure transitions
//!   returning effect descriptions for the engine to execute
//! - [`sched`] — wall-clock deadline computation (next fire, snooze wake,
//!   ringing timeout)
//! - [`sync`] — inbound reconciliation (clamp-and-echo, edge-triggered
//!   buttons) and the outbound full-state bundle
//! - [`engine`] — the single-owner engine actor and the `EngineHandle`
//!   facade
//! - [`config`] — TOML settings persistence under the user config dir

pub mod config;
pub mod engine;
pub mod machine;
pub mod sched;
pub mod sync;

pub use engine::{Clock, Engine, EngineConfig, EngineEvent, EngineHandle, SetSettingsError};
