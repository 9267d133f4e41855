#![allow(dead_code)]
//! Test harness utilities for oscalarm-net integration tests.

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use rosc::{OscPacket, OscType};

use oscalarm_types::ParamUpdate;

/// Receive one forwarded update from the link, or panic after `timeout`.
pub fn recv_update(rx: &Receiver<ParamUpdate>, timeout: Duration) -> ParamUpdate {
    rx.recv_timeout(timeout)
        .expect("timed out waiting for a decoded parameter update")
}

/// Assert that no update arrives within `window`.
pub fn assert_no_update(rx: &Receiver<ParamUpdate>, window: Duration) {
    if let Ok(update) = rx.recv_timeout(window) {
        panic!("unexpected update: {:?}", update);
    }
}

/// A bare UDP socket standing in for the remote peer.
pub struct FakePeer {
    pub socket: UdpSocket,
}

impl FakePeer {
    pub fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind fake peer");
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .expect("set peer read timeout");
        Self { socket }
    }

    pub fn addr(&self) -> String {
        self.socket.local_addr().expect("peer local addr").to_string()
    }

    /// Send raw bytes at the link's receive port.
    pub fn send_raw(&self, to: std::net::SocketAddr, buf: &[u8]) {
        self.socket.send_to(buf, to).expect("peer send");
    }

    /// Receive one datagram the link sent us, flattened to (address, arg)
    /// pairs. Decoded with rosc directly so outbound-only parameters stay
    /// visible to assertions.
    pub fn recv_decoded(&self, timeout: Duration) -> Vec<(String, OscType)> {
        let raw = self.recv_raw(timeout);
        let (_, packet) = rosc::decoder::decode_udp(&raw).expect("peer decode");
        let mut out = Vec::new();
        flatten(packet, &mut out);
        out
    }

    /// Receive one raw datagram without decoding.
    pub fn recv_raw(&self, timeout: Duration) -> Vec<u8> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 1024];
        while Instant::now() < deadline {
            if let Ok((n, _)) = self.socket.recv_from(&mut buf) {
                return buf[..n].to_vec();
            }
        }
        panic!("timed out waiting for a raw datagram");
    }
}

fn flatten(packet: OscPacket, out: &mut Vec<(String, OscType)>) {
    match packet {
        OscPacket::Message(msg) => {
            if let Some(arg) = msg.args.into_iter().next() {
                out.push((msg.addr, arg));
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in bundle.content {
                flatten(inner, out);
            }
        }
    }
}
