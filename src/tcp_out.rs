//! TCP Packet Transmission (TX Path)
//!
//! Builds the complete IPv4 datagrams this client ever sends: SYN, ACK,
//! the PSH+ACK carrying the request, and the closing FIN+ACK.

use crate::config::TransferConfig;
use crate::ip_proto::{self, Ipv4Hdr};
use crate::state::{TcpConnectionState, TcpState};
use crate::tcp_proto::{self, OutSegment};

/// TCP TX Path
///
/// Every packet is built fresh: header, checksum, serialize.
pub struct TcpTx;

impl TcpTx {
    /// SYN segment (active open), `seq = iss`, `ack = 0`
    ///
    /// Also used for retransmissions while in SYN_SENT.
    pub fn syn(
        state: &TcpConnectionState,
        ip_id: u16,
        cfg: &TransferConfig,
    ) -> Result<Vec<u8>, &'static str> {
        if state.conn_mgmt.state != TcpState::SynSent {
            return Err("Can only send SYN in SYN_SENT state");
        }

        Ok(Self::datagram(state, tcp_proto::TCP_SYN, state.rod.iss, 0, &[], ip_id, cfg))
    }

    /// Bare ACK of everything received so far
    pub fn ack(
        state: &TcpConnectionState,
        ip_id: u16,
        cfg: &TransferConfig,
    ) -> Result<Vec<u8>, &'static str> {
        if state.conn_mgmt.state == TcpState::Closed || state.conn_mgmt.state == TcpState::SynSent {
            return Err("Nothing to acknowledge before ESTABLISHED");
        }

        Ok(Self::datagram(
            state,
            tcp_proto::TCP_ACK,
            state.rod.snd_nxt,
            state.rod.rcv_nxt,
            &[],
            ip_id,
            cfg,
        ))
    }

    /// PSH+ACK carrying `payload` in one segment
    ///
    /// The caller advances `snd_nxt` once the packet is on the wire.
    pub fn request(
        state: &TcpConnectionState,
        payload: &[u8],
        ip_id: u16,
        cfg: &TransferConfig,
    ) -> Result<Vec<u8>, &'static str> {
        if state.conn_mgmt.state != TcpState::Established {
            return Err("Can only send data in ESTABLISHED state");
        }

        if payload.len() > tcp_proto::MAX_SEGMENT_PAYLOAD {
            return Err("Request does not fit in one IPv4 datagram");
        }

        Ok(Self::datagram(
            state,
            tcp_proto::TCP_PSH | tcp_proto::TCP_ACK,
            state.rod.snd_nxt,
            state.rod.rcv_nxt,
            payload,
            ip_id,
            cfg,
        ))
    }

    /// FIN+ACK acknowledging the peer's FIN and closing our side
    ///
    /// Sent in place of a bare ACK of the peer's FIN: our side closes in the
    /// same packet, with `seq = snd_nxt` (past the request).
    pub fn fin_ack(
        state: &TcpConnectionState,
        ip_id: u16,
        cfg: &TransferConfig,
    ) -> Result<Vec<u8>, &'static str> {
        if state.conn_mgmt.state != TcpState::FinWait {
            return Err("Can only acknowledge FIN in FIN_WAIT state");
        }

        Ok(Self::datagram(
            state,
            tcp_proto::TCP_FIN | tcp_proto::TCP_ACK,
            state.rod.snd_nxt,
            state.rod.rcv_nxt,
            &[],
            ip_id,
            cfg,
        ))
    }

    /// Low-level: Construct one checksummed IPv4 + TCP datagram
    fn datagram(
        state: &TcpConnectionState,
        flags: u8,
        seqno: u32,
        ackno: u32,
        payload: &[u8],
        ip_id: u16,
        cfg: &TransferConfig,
    ) -> Vec<u8> {
        let cm = &state.conn_mgmt;

        let segment = OutSegment::build(cm.local_port, cm.remote_port, seqno, ackno, flags, payload)
            .with_window(cfg.window)
            .finalize_checksum(cm.local_ip, cm.remote_ip);

        let ip = Ipv4Hdr::build(cm.local_ip, cm.remote_ip, segment.len(), ip_id, cfg.ttl)
            .finalize_checksum();

        ip_proto::combine(&ip, segment.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum;
    use crate::tcp_proto::{TCP_ACK, TCP_FIN, TCP_PSH, TCP_SYN};
    use std::net::Ipv4Addr;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const REMOTE: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

    fn syn_sent() -> TcpConnectionState {
        let mut state = TcpConnectionState::new();
        state.conn_mgmt.on_connect(LOCAL, 50000, REMOTE, 80).unwrap();
        state.rod.on_connect(1000).unwrap();
        state
    }

    #[test]
    fn test_tx_state_validation() {
        let cfg = TransferConfig::default();
        let state = TcpConnectionState::new();
        assert!(TcpTx::syn(&state, 1, &cfg).is_err());
        assert!(TcpTx::ack(&state, 1, &cfg).is_err());
        assert!(TcpTx::request(&state, b"x", 1, &cfg).is_err());
        assert!(TcpTx::fin_ack(&state, 1, &cfg).is_err());
    }

    #[test]
    fn test_syn_packet() {
        let cfg = TransferConfig::default();
        let raw = TcpTx::syn(&syn_sent(), 77, &cfg).unwrap();
        assert_eq!(raw.len(), 40);
        assert_eq!(checksum::compute_checksum(&raw[..20]), 0);
        assert!(checksum::verify_tcp(LOCAL, REMOTE, &raw[20..]));

        let seg = tcp_proto::parse(&raw).unwrap();
        assert_eq!(seg.src_ip, LOCAL);
        assert_eq!(seg.dst_ip, REMOTE);
        assert_eq!(seg.src_port, 50000);
        assert_eq!(seg.dst_port, 80);
        assert_eq!(seg.seqno, 1000);
        assert_eq!(seg.ackno, 0);
        assert_eq!(seg.flags.bits(), TCP_SYN);
        assert_eq!(seg.wnd, 65535);
        assert_eq!(u16::from_be_bytes([raw[4], raw[5]]), 77);
    }

    #[test]
    fn test_request_size_bound() {
        let cfg = TransferConfig::default();
        let mut state = syn_sent();
        state.conn_mgmt.on_synack_in_synsent().unwrap();

        let too_big = vec![b'x'; tcp_proto::MAX_SEGMENT_PAYLOAD + 1];
        assert!(TcpTx::request(&state, &too_big, 1, &cfg).is_err());

        let largest = vec![b'x'; tcp_proto::MAX_SEGMENT_PAYLOAD];
        let raw = TcpTx::request(&state, &largest, 1, &cfg).unwrap();
        assert_eq!(raw.len(), u16::MAX as usize);
        assert_eq!(u16::from_be_bytes([raw[2], raw[3]]), u16::MAX);
        assert!(checksum::verify_tcp(LOCAL, REMOTE, &raw[20..]));
    }

    #[test]
    fn test_request_and_fin_ack() {
        let cfg = TransferConfig::default();
        let mut state = syn_sent();
        state.conn_mgmt.on_synack_in_synsent().unwrap();
        state.rod.snd_nxt = 1001;
        state.rod.rcv_nxt = 5001;

        let raw = TcpTx::request(&state, b"GET / HTTP/1.0\r\n\r\n", 2, &cfg).unwrap();
        let seg = tcp_proto::parse(&raw).unwrap();
        assert_eq!(seg.flags.bits(), TCP_PSH | TCP_ACK);
        assert_eq!((seg.seqno, seg.ackno), (1001, 5001));
        assert_eq!(seg.payload, b"GET / HTTP/1.0\r\n\r\n");
        assert!(checksum::verify_tcp(LOCAL, REMOTE, &raw[20..]));

        state.conn_mgmt.on_fin_in_established().unwrap();
        state.rod.rcv_nxt = 6001;
        let raw = TcpTx::fin_ack(&state, 3, &cfg).unwrap();
        let seg = tcp_proto::parse(&raw).unwrap();
        assert_eq!(seg.flags.bits(), TCP_FIN | TCP_ACK);
        assert_eq!(seg.ackno, 6001);
    }
}
