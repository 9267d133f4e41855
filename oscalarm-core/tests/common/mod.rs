#![allow(dead_code)]
//! Test harness utilities for oscalarm-core integration tests.

use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Local};
use crossbeam_channel::{unbounded, Receiver, Sender};

use oscalarm_core::config::Store;
use oscalarm_core::{Clock, Engine, EngineConfig, EngineHandle};
use oscalarm_net::OscSink;
use oscalarm_types::{AlarmSettings, Param, ParamUpdate, ParamValue, TimerPolicy};

/// OscSink that records every outbound parameter for assertions. Bundles
/// are flattened into the same stream.
pub struct RecordingSink {
    tx: Sender<(Param, ParamValue)>,
}

impl OscSink for RecordingSink {
    fn send_param(&self, param: Param, value: ParamValue) -> io::Result<()> {
        self.tx
            .send((param, value))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn send_bundle(&self, params: &[(Param, ParamValue)]) -> io::Result<()> {
        for &entry in params {
            self.tx
                .send(entry)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))?;
        }
        Ok(())
    }
}

/// A spawned engine with its test plumbing.
pub struct TestEngine {
    pub engine: Engine,
    pub handle: EngineHandle,
    pub inbound_tx: Sender<ParamUpdate>,
    pub outbound_rx: Receiver<(Param, ParamValue)>,
    pub store: Store,
    _dir: tempfile::TempDir,
}

/// Millisecond-scale timing so tests do not wait on real heartbeats.
/// The heartbeat is kept long by default so outbound assertions are not
/// polluted; tests that want heartbeats shorten it.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        heartbeat_period: Duration::from_secs(3600),
        liveness_window: Duration::from_millis(150),
        idle_tick: Duration::from_millis(10),
        clock: Arc::new(Local::now),
    }
}

/// A clock the test controls: reads `start` plus a shared offset in
/// seconds. The engine sees time move only when the test bumps the offset.
pub fn test_clock(start: DateTime<Local>) -> (Arc<AtomicI64>, Clock) {
    let offset = Arc::new(AtomicI64::new(0));
    let reader = Arc::clone(&offset);
    let clock: Clock =
        Arc::new(move || start + ChronoDuration::seconds(reader.load(Ordering::SeqCst)));
    (offset, clock)
}

pub fn spawn_engine(
    settings: AlarmSettings,
    policy: TimerPolicy,
    config: EngineConfig,
) -> TestEngine {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::new(dir.path().join("settings.toml"));
    let (outbound_tx, outbound_rx) = unbounded();
    let (inbound_tx, inbound_rx) = unbounded();
    let engine = Engine::spawn(
        settings,
        policy,
        store.clone(),
        RecordingSink { tx: outbound_tx },
        inbound_rx,
        config,
    );
    let handle = engine.handle();
    TestEngine {
        engine,
        handle,
        inbound_tx,
        outbound_rx,
        store,
        _dir: dir,
    }
}

impl TestEngine {
    /// Feed one decoded update as if the link had received it.
    pub fn inbound(&self, param: Param, value: ParamValue) {
        self.inbound_tx
            .send(ParamUpdate { param, value })
            .expect("engine inbound channel");
    }

    /// Drain the startup push (the initial full bundle).
    pub fn drain_startup(&self) {
        for _ in 0..4 {
            recv_outbound(&self.outbound_rx, Duration::from_secs(2));
        }
    }
}

pub fn recv_outbound(
    rx: &Receiver<(Param, ParamValue)>,
    timeout: Duration,
) -> (Param, ParamValue) {
    rx.recv_timeout(timeout)
        .expect("timed out waiting for an outbound parameter")
}

pub fn assert_no_outbound(rx: &Receiver<(Param, ParamValue)>, window: Duration) {
    if let Ok(sent) = rx.recv_timeout(window) {
        panic!("unexpected outbound parameter: {:?}", sent);
    }
}

/// Poll `cond` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    panic!("condition not reached within {:?}", timeout);
}
