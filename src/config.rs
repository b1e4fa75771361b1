//! Transfer Configuration

use std::time::Duration;

use crate::ip_proto::IP_DEFAULT_TTL;
use crate::tcp_proto::TCP_WND;

/// Idle interval after which an established transfer is abandoned
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// First wait for a SYN+ACK; doubled on every retransmission
pub const DEFAULT_SYN_TIMEOUT: Duration = Duration::from_secs(1);

pub const DEFAULT_MAX_SYN_TIMEOUT: Duration = Duration::from_secs(32);

pub const DEFAULT_SYN_RETRIES: u32 = 5;

/// Largest IPv4 datagram
pub const DEFAULT_RECV_BUFFER_LEN: usize = 65535;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub idle_timeout: Duration,
    pub syn_timeout: Duration,
    pub max_syn_timeout: Duration,
    /// SYN retransmissions before giving up on the handshake
    pub syn_retries: u32,
    pub window: u16,
    pub ttl: u8,
    /// Acknowledge each in-order data segment
    pub ack_data: bool,
    /// Drop inbound segments whose TCP checksum does not verify
    pub verify_checksums: bool,
    pub recv_buffer_len: usize,
}

impl TransferConfig {
    /// Wait before SYN retransmission number `attempt` (0 for the first SYN).
    pub fn syn_backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.syn_timeout
            .checked_mul(factor)
            .map_or(self.max_syn_timeout, |d| d.min(self.max_syn_timeout))
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            syn_timeout: DEFAULT_SYN_TIMEOUT,
            max_syn_timeout: DEFAULT_MAX_SYN_TIMEOUT,
            syn_retries: DEFAULT_SYN_RETRIES,
            window: TCP_WND,
            ttl: IP_DEFAULT_TTL,
            ack_data: true,
            verify_checksums: false,
            recv_buffer_len: DEFAULT_RECV_BUFFER_LEN,
        }
    }
}
