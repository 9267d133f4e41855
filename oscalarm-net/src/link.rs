//! UDP link to the remote parameter peer.
//!
//! The receive half runs on its own thread: it only decodes datagrams and
//! forwards typed updates into a channel, so a stalled peer can never stall
//! the engine. The send half is fire-and-forget; a lost datagram is
//! repaired by the next heartbeat.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use log::{debug, info, warn};

use oscalarm_types::{Param, ParamUpdate, ParamValue};

use crate::codec;

/// Outbound half of the protocol boundary. The engine talks to this trait
/// so tests can substitute a recording sink.
pub trait OscSink: Send + 'static {
    fn send_param(&self, param: Param, value: ParamValue) -> io::Result<()>;
    fn send_bundle(&self, params: &[(Param, ParamValue)]) -> io::Result<()>;
}

/// Read timeout on the receive socket; bounds shutdown latency.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);

/// Bidirectional UDP endpoint: listens on a fixed local port for peer
/// parameter writes and sends to the peer's fixed, pre-known port.
pub struct OscLink {
    send_socket: UdpSocket,
    peer_addr: String,
    recv_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    recv_thread: Option<JoinHandle<()>>,
}

impl OscLink {
    /// Bind `bind_addr` and start forwarding decoded updates into
    /// `updates`. Outbound parameters go to `peer_addr`.
    pub fn open(bind_addr: &str, peer_addr: &str, updates: Sender<ParamUpdate>) -> io::Result<Self> {
        let recv_socket = UdpSocket::bind(bind_addr)?;
        recv_socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let recv_addr = recv_socket.local_addr()?;
        let send_socket = UdpSocket::bind("0.0.0.0:0")?;
        info!("OSC link listening on {}, peer {}", recv_addr, peer_addr);

        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let recv_thread = thread::spawn(move || {
            let mut buf = [0u8; 1024];
            loop {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                match recv_socket.recv_from(&mut buf) {
                    Ok((n, _from)) => match codec::decode_datagram(&buf[..n]) {
                        Ok(decoded) => {
                            for update in decoded {
                                if updates.send(update).is_err() {
                                    // Engine is gone; nothing left to feed.
                                    return;
                                }
                            }
                        }
                        Err(e) => debug!("dropping datagram: {}", e),
                    },
                    Err(ref e)
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(e) => {
                        warn!("OSC receive error: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            send_socket,
            peer_addr: peer_addr.to_string(),
            recv_addr,
            shutdown,
            recv_thread: Some(recv_thread),
        })
    }

    /// The actually bound receive address (useful when bound to port 0).
    pub fn recv_addr(&self) -> SocketAddr {
        self.recv_addr
    }
}

impl OscSink for OscLink {
    fn send_param(&self, param: Param, value: ParamValue) -> io::Result<()> {
        let buf = codec::encode_param(param, value)?;
        self.send_socket.send_to(&buf, &self.peer_addr)?;
        Ok(())
    }

    fn send_bundle(&self, params: &[(Param, ParamValue)]) -> io::Result<()> {
        let buf = codec::encode_bundle(params)?;
        self.send_socket.send_to(&buf, &self.peer_addr)?;
        Ok(())
    }
}

impl Drop for OscLink {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.recv_thread.take() {
            let _ = handle.join();
        }
    }
}
