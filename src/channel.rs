//! Raw IP channel
//!
//! The engine needs exactly two operations from the network: write a full
//! IPv4 datagram (header included) to a destination, and read the next
//! inbound datagram. [`RawChannel`] is that seam; [`PnetChannel`] backs it
//! with a layer-3 raw socket, and tests back it with a scripted peer.

use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

use log::debug;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::packet::Packet;
use pnet::transport::{
    ipv4_packet_iter, transport_channel, TransportChannelType, TransportReceiver, TransportSender,
};

use crate::error::TransferError;

/// How long one `receive` call waits before reporting "no data"
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub trait RawChannel {
    /// Write one complete IPv4 datagram to `dest`.
    fn send(&mut self, dest: Ipv4Addr, packet: &[u8]) -> io::Result<usize>;

    /// Copy the next inbound IPv4 datagram into `buf`.
    ///
    /// `Ok(0)` means nothing arrived this poll; callers keep polling.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Raw socket pair for TCP: we supply IP headers, the kernel delivers
/// every inbound TCP datagram with its IP header.
pub struct PnetChannel {
    tx: TransportSender,
    rx: TransportReceiver,
    poll_interval: Duration,
}

impl PnetChannel {
    /// Open the channel. Needs root or CAP_NET_RAW.
    pub fn open(buffer_len: usize, poll_interval: Duration) -> Result<Self, TransferError> {
        let protocol = TransportChannelType::Layer3(IpNextHeaderProtocols::Tcp);
        let (tx, rx) = transport_channel(buffer_len, protocol).map_err(TransferError::Setup)?;
        debug!("raw channel open, buffer {} bytes", buffer_len);
        Ok(Self {
            tx,
            rx,
            poll_interval,
        })
    }
}

impl RawChannel for PnetChannel {
    fn send(&mut self, dest: Ipv4Addr, packet: &[u8]) -> io::Result<usize> {
        let datagram = Ipv4Packet::new(packet)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "short IPv4 packet"))?;
        self.tx.send_to(datagram, IpAddr::V4(dest))
    }

    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut iter = ipv4_packet_iter(&mut self.rx);
        match iter.next_with_timeout(self.poll_interval)? {
            Some((packet, _addr)) => {
                let bytes = packet.packet();
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            None => Ok(0),
        }
    }
}

/// Address of the interface the kernel would route to `remote` through.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn local_ipv4_for(remote: Ipv4Addr) -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((remote, 80))?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(addr) => Ok(addr),
        IpAddr::V6(_) => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no IPv4 route to remote",
        )),
    }
}
