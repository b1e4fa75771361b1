//! TCP State Components
//!
//! This module contains the disjoint TCP state components:
//! 1. Connection Management - TCP state machine and the connection 4-tuple
//! 2. Reliable Ordered Delivery - Sequence numbers and ACKs

mod connection_mgmt;
mod rod;

pub use connection_mgmt::ConnectionManagementState;
pub use rod::ReliableOrderedDeliveryState;
