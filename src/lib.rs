//! TCP/IP over a raw socket
//!
//! This crate builds IPv4 and TCP headers by hand, runs the client side of
//! a single TCP connection in user space, and uses it to fetch one HTTP
//! resource. The kernel's TCP stack is bypassed; only a raw IP channel is
//! needed (root or CAP_NET_RAW on Linux).
//!
//! Layers, bottom-up:
//! - [`checksum`]: RFC 1071 Internet checksum and the TCP pseudo-header
//! - [`ip_proto`], [`tcp_proto`]: header builders and the inbound parser
//! - [`components`], [`state`]: connection state machine and sequence space
//! - [`tcp_out`], [`tcp_in`]: TX and RX paths
//! - [`transfer`]: drives handshake, request, response and teardown over a [`RawChannel`]

pub mod channel;
pub mod checksum;
pub mod components;
pub mod config;
pub mod error;
pub mod http;
pub mod ip_proto;
pub mod random;
pub mod state;
pub mod tcp_in;
pub mod tcp_out;
pub mod tcp_proto;
pub mod tcp_types;
pub mod transfer;

pub use channel::{local_ipv4_for, PnetChannel, RawChannel};
pub use config::TransferConfig;
pub use error::TransferError;
pub use http::{build_get_request, output_file_name, split_response, HttpError, HttpTarget};
pub use random::{FixedSource, RandomSource, RngSource};
pub use state::{TcpConnectionState, TcpState};
pub use tcp_types::{ParseError, TcpFlags, TcpSegment};
pub use transfer::HttpGetTransfer;
