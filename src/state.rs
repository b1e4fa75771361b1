//! TCP Connection State
//!
//! This module provides the complete TCP connection state by aggregating
//! the state components from the components module.

pub use crate::components::{ConnectionManagementState, ReliableOrderedDeliveryState};

/// TCP State Machine States
///
/// Only the client side of a single connection is modelled:
/// `Closed -> SynSent -> Established -> FinWait -> Closed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TcpState {
    Closed,
    SynSent,
    Established,
    FinWait,
}

/// Complete TCP Connection State
///
/// Created once per transfer, mutated only by the transfer driver.
pub struct TcpConnectionState {
    pub conn_mgmt: ConnectionManagementState,
    pub rod: ReliableOrderedDeliveryState,
}

impl TcpConnectionState {
    pub fn new() -> Self {
        Self {
            conn_mgmt: ConnectionManagementState::new(),
            rod: ReliableOrderedDeliveryState::new(),
        }
    }

    pub fn state(&self) -> TcpState {
        self.conn_mgmt.state
    }
}

impl Default for TcpConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
