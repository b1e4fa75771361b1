//! Connection Management Component
//!
//! This component owns the TCP state machine and the connection 4-tuple.

use std::net::Ipv4Addr;

use crate::state::TcpState;
use crate::tcp_types::TcpSegment;

/// Connection Management State
///
/// Only the transfer driver writes to this state, through the
/// transition methods below.
pub struct ConnectionManagementState {
    /* Connection Identifier (Tuple) */
    pub local_ip: Ipv4Addr,
    pub remote_ip: Ipv4Addr,
    pub local_port: u16,
    pub remote_port: u16,

    /* Lifecycle State */
    pub state: TcpState,
}

impl ConnectionManagementState {
    pub fn new() -> Self {
        Self {
            local_ip: Ipv4Addr::UNSPECIFIED,
            remote_ip: Ipv4Addr::UNSPECIFIED,
            local_port: 0,
            remote_port: 0,
            state: TcpState::Closed,
        }
    }

    /// True if `seg` travelled from our peer to our endpoint.
    ///
    /// A raw receive channel sees every TCP packet on the host, so nothing
    /// is trusted until the full 4-tuple matches.
    pub fn matches(&self, seg: &TcpSegment) -> bool {
        seg.src_ip == self.remote_ip
            && seg.dst_ip == self.local_ip
            && seg.src_port == self.remote_port
            && seg.dst_port == self.local_port
    }

    // ------------------------------------------------------------------------
    // Connection Setup (Handshake)
    // ------------------------------------------------------------------------

    /// CLOSED → SYN_SENT: Initiate active connection
    pub fn on_connect(
        &mut self,
        local_ip: Ipv4Addr,
        local_port: u16,
        remote_ip: Ipv4Addr,
        remote_port: u16,
    ) -> Result<(), &'static str> {
        if self.state != TcpState::Closed {
            return Err("Can only connect from CLOSED state");
        }

        if local_port == 0 || remote_port == 0 {
            return Err("Port 0 is not a valid endpoint");
        }

        self.local_ip = local_ip;
        self.local_port = local_port;
        self.remote_ip = remote_ip;
        self.remote_port = remote_port;

        self.state = TcpState::SynSent;

        Ok(())
    }

    /// SYN_SENT → ESTABLISHED: Handle incoming SYN+ACK (active open)
    pub fn on_synack_in_synsent(&mut self) -> Result<(), &'static str> {
        if self.state != TcpState::SynSent {
            return Err("Not in SYN_SENT state");
        }

        self.state = TcpState::Established;

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Connection Teardown (Close)
    // ------------------------------------------------------------------------

    /// ESTABLISHED → FIN_WAIT: Receive FIN from peer
    pub fn on_fin_in_established(&mut self) -> Result<(), &'static str> {
        if self.state != TcpState::Established {
            return Err("Not in ESTABLISHED state");
        }

        self.state = TcpState::FinWait;

        Ok(())
    }

    /// FIN_WAIT → CLOSED: Our acknowledgment of the FIN has gone out
    pub fn on_finack_sent(&mut self) -> Result<(), &'static str> {
        if self.state != TcpState::FinWait {
            return Err("Not in FIN_WAIT state");
        }

        self.state = TcpState::Closed;

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reset Handling
    // ------------------------------------------------------------------------

    /// ANY → CLOSED: Receive RST
    pub fn on_rst(&mut self) -> Result<(), &'static str> {
        self.state = TcpState::Closed;
        Ok(())
    }

    /// ANY → CLOSED: Give up (timeout or transmission failure)
    pub fn on_abort(&mut self) -> Result<(), &'static str> {
        self.state = TcpState::Closed;
        Ok(())
    }
}

impl Default for ConnectionManagementState {
    fn default() -> Self {
        Self::new()
    }
}
