//! TCP Packet Reception (RX Path)
//!
//! Parses incoming datagrams and dispatches segments to the handler for
//! the current state. Handlers update the state components and return the
//! [`InputAction`] the transfer driver must carry out.

use log::{debug, trace, warn};

use crate::checksum;
use crate::state::{TcpConnectionState, TcpState};
use crate::tcp_proto;
use crate::tcp_types::{InputAction, ParseError, TcpSegment};

/// TCP RX Path
pub struct TcpRx;

impl TcpRx {
    /// Parse a raw datagram, optionally verifying the TCP checksum.
    pub fn parse_packet(raw: &[u8], verify_checksum: bool) -> Result<TcpSegment, ParseError> {
        let seg = tcp_proto::parse(raw)?;

        if verify_checksum && !checksum::verify_tcp(seg.src_ip, seg.dst_ip, tcp_proto::tcp_bytes(raw))
        {
            return Err(ParseError::BadChecksum);
        }

        Ok(seg)
    }

    /// Process an incoming TCP segment
    ///
    /// Segments that do not belong to this connection's 4-tuple are dropped
    /// before any flag is looked at.
    pub fn process_segment(state: &mut TcpConnectionState, seg: TcpSegment) -> InputAction {
        if !state.conn_mgmt.matches(&seg) {
            trace!(
                "drop {}:{} -> {}:{}: not our connection",
                seg.src_ip,
                seg.src_port,
                seg.dst_ip,
                seg.dst_port
            );
            return InputAction::Drop;
        }

        match state.conn_mgmt.state {
            TcpState::SynSent => Self::process_synsent(state, &seg),
            TcpState::Established => Self::process_established(state, seg),
            TcpState::FinWait | TcpState::Closed => InputAction::Drop,
        }
    }

    /// Process segment in SYN_SENT state
    fn process_synsent(state: &mut TcpConnectionState, seg: &TcpSegment) -> InputAction {
        if seg.flags.rst {
            if state.rod.is_rst_for_syn(seg) {
                let _ = state.rod.on_rst();
                let _ = state.conn_mgmt.on_rst();
                return InputAction::Refused;
            }
            trace!("ignore RST with ack={} in SYN_SENT", seg.ackno);
            return InputAction::Drop;
        }

        if seg.flags.syn && seg.flags.ack {
            if let Err(e) = state.rod.on_synack_in_synsent(seg) {
                trace!("ignore SYN+ACK ack={}: {}", seg.ackno, e);
                return InputAction::Drop;
            }
            if let Err(e) = state.conn_mgmt.on_synack_in_synsent() {
                warn!("SYN+ACK accepted but state rejected it: {}", e);
                return InputAction::Drop;
            }
            return InputAction::Connected;
        }

        InputAction::Drop
    }

    /// Process segment in ESTABLISHED state
    fn process_established(state: &mut TcpConnectionState, seg: TcpSegment) -> InputAction {
        if seg.flags.rst {
            if state.rod.rst_in_window(&seg) {
                let _ = state.rod.on_rst();
                let _ = state.conn_mgmt.on_rst();
                return InputAction::Reset;
            }
            trace!("ignore RST seq={} (expected {})", seg.seqno, state.rod.rcv_nxt);
            return InputAction::Drop;
        }

        if seg.flags.syn {
            // Retransmitted SYN+ACK: our handshake ACK was lost
            if seg.flags.ack && seg.seqno == state.rod.irs {
                return InputAction::SendAck;
            }
            return InputAction::Drop;
        }

        // RFC 793: past the handshake every acceptable segment carries ACK
        if !seg.flags.ack {
            trace!("drop seq={}: no ACK", seg.seqno);
            return InputAction::Drop;
        }

        if let Err(e) = state.rod.on_ack_in_established(&seg) {
            trace!("drop seq={} ack={}: {}", seg.seqno, seg.ackno, e);
            return InputAction::Drop;
        }

        if seg.flags.fin {
            return Self::process_fin(state, seg);
        }

        if !state.rod.in_order(&seg) {
            if seg.payload.is_empty() {
                return InputAction::Drop;
            }
            debug!(
                "out of order seq={} len={} (expected {}), re-acking",
                seg.seqno,
                seg.payload.len(),
                state.rod.rcv_nxt
            );
            return InputAction::SendAck;
        }

        if let Err(e) = state.rod.on_data_in_established(&seg) {
            trace!("drop seq={}: {}", seg.seqno, e);
            return InputAction::Drop;
        }

        if seg.payload.is_empty() {
            InputAction::Accept
        } else {
            InputAction::Deliver(seg.payload)
        }
    }

    /// FIN in ESTABLISHED: the peer is done sending
    ///
    /// A FIN at or beyond `rcv_nxt` closes the connection even if data is
    /// missing before it; its own payload is still delivered.
    fn process_fin(state: &mut TcpConnectionState, seg: TcpSegment) -> InputAction {
        if let Err(e) = state.rod.on_fin_in_established(&seg) {
            debug!("FIN seq={} (expected {}): {}, re-acking", seg.seqno, state.rod.rcv_nxt, e);
            return InputAction::SendAck;
        }
        if let Err(e) = state.conn_mgmt.on_fin_in_established() {
            warn!("FIN accepted but state rejected it: {}", e);
            return InputAction::Drop;
        }
        InputAction::Fin(seg.payload)
    }
}
