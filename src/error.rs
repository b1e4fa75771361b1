//! Transfer errors
//!
//! Every fatal condition stops the state machine and surfaces here.
//! Variants that end mid-transfer carry whatever response bytes arrived.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    /// Raw channel could not be opened or bound
    #[error("raw channel setup failed: {0}")]
    Setup(#[source] io::Error),

    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),

    /// Peer never answered our SYN
    #[error("no SYN+ACK after {attempts} SYN(s)")]
    HandshakeTimeout { attempts: u32 },

    /// Peer answered our SYN with RST
    #[error("connection refused")]
    ConnectionRefused,

    /// Peer reset the established connection
    #[error("connection reset by peer after {} byte(s)", .partial.len())]
    ConnectionReset { partial: Vec<u8> },

    /// Peer went quiet mid-transfer
    #[error("connection idle for too long after {} byte(s)", .partial.len())]
    IdleTimeout { partial: Vec<u8> },

    /// Internal state machine inconsistency
    #[error("invalid state: {0}")]
    State(&'static str),
}

impl TransferError {
    /// Response bytes received before the failure, if the failure came mid-transfer.
    pub fn partial_response(&self) -> Option<&[u8]> {
        match self {
            TransferError::ConnectionReset { partial } | TransferError::IdleTimeout { partial } => {
                Some(partial)
            }
            _ => None,
        }
    }

    pub fn into_partial_response(self) -> Option<Vec<u8>> {
        match self {
            TransferError::ConnectionReset { partial } | TransferError::IdleTimeout { partial } => {
                Some(partial)
            }
            _ => None,
        }
    }
}

impl From<&'static str> for TransferError {
    fn from(e: &'static str) -> Self {
        TransferError::State(e)
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
