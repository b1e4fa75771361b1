//! Test Helper Functions for Transfer Tests
//!
//! Provides a scripted peer that stands in for the raw channel, packet
//! crafting from the peer's side, and a transfer wired to fixed randomness.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::thread;
use std::time::{Duration, Instant};

use rawhttpget::checksum;
use rawhttpget::ip_proto::{self, Ipv4Hdr};
use rawhttpget::tcp_proto::{self, OutSegment};
use rawhttpget::{
    build_get_request, FixedSource, HttpGetTransfer, HttpTarget, RawChannel, TcpSegment,
    TransferConfig,
};

/// Test endpoints on a private /24
pub const TEST_LOCAL_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);
pub const TEST_REMOTE_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 2);
pub const TEST_LOCAL_PORT: u16 = 50000;
pub const TEST_REMOTE_PORT: u16 = 80;

/// Our initial sequence number and the peer's
pub const TEST_ISS: u32 = 1000;
pub const TEST_IRS: u32 = 5000;

pub const TEST_URL: &str = "http://192.168.0.2/index.html";

/// One step of the peer's script
#[derive(Debug, Clone)]
pub enum Inbound {
    Packet(Vec<u8>),
    /// Report "no data" until this much time has passed
    Silence(Duration),
    /// Fail the receive call once
    Error(io::ErrorKind),
}

/// Channel double: replays a fixed script and captures everything sent.
///
/// Once the script runs out the peer stays silent.
pub struct ScriptedPeer {
    pub inbound: VecDeque<Inbound>,
    pub sent: Vec<(Ipv4Addr, Vec<u8>)>,
    pub fail_sends: bool,
    silence_started: Option<Instant>,
}

impl ScriptedPeer {
    pub fn new(script: Vec<Inbound>) -> Self {
        Self {
            inbound: script.into(),
            sent: Vec::new(),
            fail_sends: false,
            silence_started: None,
        }
    }

    pub fn packets(packets: Vec<Vec<u8>>) -> Self {
        Self::new(packets.into_iter().map(Inbound::Packet).collect())
    }

    /// Everything we sent, parsed back into segments
    pub fn sent_segments(&self) -> Vec<TcpSegment> {
        self.sent
            .iter()
            .map(|(_, raw)| tcp_proto::parse(raw).expect("engine sent an unparseable packet"))
            .collect()
    }

    fn idle() -> io::Result<usize> {
        thread::sleep(Duration::from_millis(1));
        Ok(0)
    }
}

impl RawChannel for ScriptedPeer {
    fn send(&mut self, dest: Ipv4Addr, packet: &[u8]) -> io::Result<usize> {
        if self.fail_sends {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "send refused"));
        }
        self.sent.push((dest, packet.to_vec()));
        Ok(packet.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbound.pop_front() {
            None => Self::idle(),
            Some(Inbound::Packet(raw)) => {
                let n = raw.len().min(buf.len());
                buf[..n].copy_from_slice(&raw[..n]);
                Ok(n)
            }
            Some(Inbound::Error(kind)) => Err(io::Error::new(kind, "scripted failure")),
            Some(Inbound::Silence(d)) => {
                let started = *self.silence_started.get_or_insert_with(Instant::now);
                if started.elapsed() < d {
                    self.inbound.push_front(Inbound::Silence(d));
                } else {
                    self.silence_started = None;
                }
                Self::idle()
            }
        }
    }
}

/// Datagram from an arbitrary endpoint to our local endpoint
pub fn packet_from(
    src_ip: Ipv4Addr,
    src_port: u16,
    seqno: u32,
    ackno: u32,
    flags: u8,
    payload: &[u8],
) -> Vec<u8> {
    let seg = OutSegment::build(src_port, TEST_LOCAL_PORT, seqno, ackno, flags, payload)
        .with_window(8192)
        .finalize_checksum(src_ip, TEST_LOCAL_IP);
    let ip = Ipv4Hdr::build(src_ip, TEST_LOCAL_IP, seg.len(), 0x1234, 64).finalize_checksum();
    ip_proto::combine(&ip, seg.as_bytes())
}

/// Datagram from the peer to us
pub fn peer_packet(seqno: u32, ackno: u32, flags: u8, payload: &[u8]) -> Vec<u8> {
    packet_from(TEST_REMOTE_IP, TEST_REMOTE_PORT, seqno, ackno, flags, payload)
}

/// The peer's SYN+ACK for our SYN
pub fn peer_synack() -> Vec<u8> {
    peer_packet(
        TEST_IRS,
        TEST_ISS + 1,
        tcp_proto::TCP_SYN | tcp_proto::TCP_ACK,
        &[],
    )
}

pub fn test_request() -> Vec<u8> {
    build_get_request(&HttpTarget::parse(TEST_URL).expect("test URL parses"))
}

/// Our sequence number once the request is out
pub fn snd_nxt_after_request() -> u32 {
    TEST_ISS + 1 + test_request().len() as u32
}

/// Short timers so failure paths finish quickly
pub fn fast_config() -> TransferConfig {
    TransferConfig {
        idle_timeout: Duration::from_millis(100),
        syn_timeout: Duration::from_millis(10),
        max_syn_timeout: Duration::from_millis(40),
        syn_retries: 2,
        ..TransferConfig::default()
    }
}

pub fn create_transfer(
    peer: ScriptedPeer,
    cfg: TransferConfig,
) -> HttpGetTransfer<ScriptedPeer, FixedSource> {
    HttpGetTransfer::new(
        peer,
        FixedSource::new(TEST_LOCAL_PORT, TEST_ISS),
        cfg,
        TEST_LOCAL_IP,
        SocketAddrV4::new(TEST_REMOTE_IP, TEST_REMOTE_PORT),
    )
}

/// Both checksums of a datagram we sent verify
pub fn checksums_valid(raw: &[u8]) -> bool {
    checksum::compute_checksum(&raw[..ip_proto::IP_HLEN]) == 0
        && checksum::verify_tcp(TEST_LOCAL_IP, TEST_REMOTE_IP, tcp_proto::tcp_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_packet_is_addressed_to_us() {
        let seg = tcp_proto::parse(&peer_synack()).unwrap();
        assert_eq!(seg.src_ip, TEST_REMOTE_IP);
        assert_eq!(seg.dst_ip, TEST_LOCAL_IP);
        assert_eq!(seg.dst_port, TEST_LOCAL_PORT);
        assert!(seg.flags.syn && seg.flags.ack);
    }

    #[test]
    fn test_scripted_peer_replays_then_goes_quiet() {
        let mut peer = ScriptedPeer::packets(vec![peer_synack()]);
        let mut buf = [0u8; 128];
        assert_eq!(peer.receive(&mut buf).unwrap(), 40);
        assert_eq!(peer.receive(&mut buf).unwrap(), 0);
    }
}
