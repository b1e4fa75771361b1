//! TCP Common Types
//!
//! Shared types used across TCP implementation modules.

use std::net::Ipv4Addr;

use thiserror::Error;

use crate::tcp_proto;

/// TCP Flags from the header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
}

impl TcpFlags {
    pub fn from_tcphdr(flags: u8) -> Self {
        Self {
            fin: (flags & tcp_proto::TCP_FIN) != 0,
            syn: (flags & tcp_proto::TCP_SYN) != 0,
            rst: (flags & tcp_proto::TCP_RST) != 0,
            psh: (flags & tcp_proto::TCP_PSH) != 0,
            ack: (flags & tcp_proto::TCP_ACK) != 0,
            urg: (flags & tcp_proto::TCP_URG) != 0,
        }
    }

    /// Pack back into the low six bits of the flag byte.
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.fin {
            bits |= tcp_proto::TCP_FIN;
        }
        if self.syn {
            bits |= tcp_proto::TCP_SYN;
        }
        if self.rst {
            bits |= tcp_proto::TCP_RST;
        }
        if self.psh {
            bits |= tcp_proto::TCP_PSH;
        }
        if self.ack {
            bits |= tcp_proto::TCP_ACK;
        }
        if self.urg {
            bits |= tcp_proto::TCP_URG;
        }
        bits
    }
}

/// Parsed inbound TCP segment, with the addresses of its IP envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub seqno: u32,
    pub ackno: u32,
    /// Header length in 32-bit words
    pub data_offset: u8,
    pub flags: TcpFlags,
    pub wnd: u16,
    pub chksum: u16,
    pub payload: Vec<u8>,
}

impl TcpSegment {
    pub fn payload_len(&self) -> u32 {
        self.payload.len() as u32
    }
}

/// Why an inbound buffer was not a usable IPv4/TCP packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("packet too short: {0} bytes")]
    TooShort(usize),
    #[error("not an IPv4 packet (version {0})")]
    NotIpv4(u8),
    #[error("bad IP header length: {0} bytes")]
    BadIpHeaderLength(usize),
    #[error("not TCP (protocol {0})")]
    NotTcp(u8),
    #[error("IP total length {total} does not fit the {captured} bytes received")]
    BadTotalLength { total: usize, captured: usize },
    #[error("bad TCP data offset: {0}")]
    BadDataOffset(u8),
    #[error("TCP checksum does not verify")]
    BadChecksum,
}

/// Action to take after processing input
#[derive(Debug, PartialEq, Eq)]
pub enum InputAction {
    /// Not part of this connection, or not acceptable in the current state
    Drop,
    /// Valid for the connection, nothing to deliver
    Accept,
    /// Duplicate or beyond a gap: re-acknowledge `rcv_nxt`
    SendAck,
    /// SYN+ACK for our SYN: handshake completes
    Connected,
    /// RST answering our SYN
    Refused,
    /// In-order payload; `rcv_nxt` already advanced past it
    Deliver(Vec<u8>),
    /// Peer closed; carries any payload that rode on the FIN segment
    Fin(Vec<u8>),
    /// Peer reset an established connection
    Reset,
}
