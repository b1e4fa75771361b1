//! TCP Protocol Definitions
//!
//! Pure Rust implementation of TCP protocol structures and constants:
//! building outbound segments, checksumming them, and parsing inbound
//! IPv4 datagrams back into [`TcpSegment`]s.

use std::net::Ipv4Addr;

use crate::checksum;
use crate::ip_proto::{IP_HLEN, IP_PROTO_TCP};
use crate::tcp_types::{ParseError, TcpFlags, TcpSegment};

/// TCP header length (excluding options)
pub const TCP_HLEN: usize = 20;

/// Data offset of an option-less header, in 32-bit words
pub const TCP_DATA_OFFSET: u16 = (TCP_HLEN / 4) as u16;

/// Smallest datagram `parse` accepts: IP header + TCP header
pub const MIN_PACKET_LEN: usize = IP_HLEN + TCP_HLEN;

/// Largest payload whose datagram length still fits the 16-bit IP total length
pub const MAX_SEGMENT_PAYLOAD: usize = u16::MAX as usize - MIN_PACKET_LEN;

/// Advertised window; no window scaling
pub const TCP_WND: u16 = 65535;

/// TCP header flags
pub const TCP_FIN: u8 = 0x01;
pub const TCP_SYN: u8 = 0x02;
pub const TCP_RST: u8 = 0x04;
pub const TCP_PSH: u8 = 0x08;
pub const TCP_ACK: u8 = 0x10;
pub const TCP_URG: u8 = 0x20;
pub const TCP_FLAGS: u8 = 0x3F;

const TCP_CHKSUM_OFFSET: usize = 16;

/// TCP Header Structure
///
/// Fields are kept in host byte order and converted on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TcpHdr {
    /// Source port
    pub src: u16,

    /// Destination port
    pub dest: u16,

    /// Sequence number
    pub seqno: u32,

    /// Acknowledgment number
    pub ackno: u32,

    /// Upper 4 bits: data offset (header length in 32-bit words)
    /// Lower 12 bits: reserved + flags
    pub hdrlen_rsvd_flags: u16,

    /// Window size
    pub wnd: u16,

    /// Checksum
    pub chksum: u16,

    /// Urgent pointer
    pub urgp: u16,
}

impl TcpHdr {
    /// Get header length in 32-bit words
    #[inline]
    pub fn hdrlen(&self) -> u16 {
        self.hdrlen_rsvd_flags >> 12
    }

    /// Get header length in bytes
    #[inline]
    pub fn hdrlen_bytes(&self) -> usize {
        (self.hdrlen() as usize) << 2
    }

    /// Get TCP flags
    #[inline]
    pub fn flags(&self) -> u8 {
        (self.hdrlen_rsvd_flags & TCP_FLAGS as u16) as u8
    }

    /// Set header length and flags together
    #[inline]
    pub fn set_hdrlen_flags(&mut self, len: u16, flags: u8) {
        self.hdrlen_rsvd_flags = (len << 12) | (flags & TCP_FLAGS) as u16;
    }

    /// Serialize into the first 20 bytes of `buf`.
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..2].copy_from_slice(&self.src.to_be_bytes());
        buf[2..4].copy_from_slice(&self.dest.to_be_bytes());
        buf[4..8].copy_from_slice(&self.seqno.to_be_bytes());
        buf[8..12].copy_from_slice(&self.ackno.to_be_bytes());
        buf[12..14].copy_from_slice(&self.hdrlen_rsvd_flags.to_be_bytes());
        buf[14..16].copy_from_slice(&self.wnd.to_be_bytes());
        buf[16..18].copy_from_slice(&self.chksum.to_be_bytes());
        buf[18..20].copy_from_slice(&self.urgp.to_be_bytes());
    }

    /// Read the fixed part of a header. `buf` must hold at least 20 bytes.
    pub fn read_from(buf: &[u8]) -> Self {
        let be16 = |at: usize| u16::from_be_bytes([buf[at], buf[at + 1]]);
        let be32 = |at: usize| u32::from_be_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        Self {
            src: be16(0),
            dest: be16(2),
            seqno: be32(4),
            ackno: be32(8),
            hdrlen_rsvd_flags: be16(12),
            wnd: be16(14),
            chksum: be16(16),
            urgp: be16(18),
        }
    }
}

/// Outbound TCP segment: header plus payload, ready to be wrapped in IP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutSegment {
    bytes: Vec<u8>,
}

impl OutSegment {
    /// Assemble a 20-byte header followed by `payload`. The checksum is left zero.
    ///
    /// `payload` must not exceed [`MAX_SEGMENT_PAYLOAD`]; [`crate::tcp_out::TcpTx`]
    /// checks this before building.
    pub fn build(
        src_port: u16,
        dst_port: u16,
        seqno: u32,
        ackno: u32,
        flags: u8,
        payload: &[u8],
    ) -> Self {
        let mut hdr = TcpHdr {
            src: src_port,
            dest: dst_port,
            seqno,
            ackno,
            hdrlen_rsvd_flags: 0,
            wnd: TCP_WND,
            chksum: 0,
            urgp: 0,
        };
        hdr.set_hdrlen_flags(TCP_DATA_OFFSET, flags);

        let mut bytes = vec![0u8; TCP_HLEN + payload.len()];
        hdr.write_to(&mut bytes);
        bytes[TCP_HLEN..].copy_from_slice(payload);

        Self { bytes }
    }

    /// Override the advertised window.
    pub fn with_window(mut self, wnd: u16) -> Self {
        self.bytes[14..16].copy_from_slice(&wnd.to_be_bytes());
        self
    }

    /// Compute the checksum over pseudo-header + segment (checksum zeroed) and patch it in.
    pub fn finalize_checksum(mut self, src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        self.bytes[TCP_CHKSUM_OFFSET] = 0;
        self.bytes[TCP_CHKSUM_OFFSET + 1] = 0;
        let sum = checksum::tcp_checksum(src, dst, &self.bytes);
        self.bytes[TCP_CHKSUM_OFFSET..TCP_CHKSUM_OFFSET + 2].copy_from_slice(&sum.to_be_bytes());
        self
    }

    pub fn header(&self) -> TcpHdr {
        TcpHdr::read_from(&self.bytes)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Parse a received IPv4 datagram carrying TCP.
///
/// The IP header length comes from the IHL nibble; the TCP header length
/// from the data offset. Bytes past the IP total length (link padding) are
/// ignored.
pub fn parse(raw: &[u8]) -> Result<TcpSegment, ParseError> {
    if raw.len() < MIN_PACKET_LEN {
        return Err(ParseError::TooShort(raw.len()));
    }

    let version = raw[0] >> 4;
    if version != 4 {
        return Err(ParseError::NotIpv4(version));
    }

    let ip_hlen = (raw[0] & 0x0F) as usize * 4;
    if ip_hlen < IP_HLEN {
        return Err(ParseError::BadIpHeaderLength(ip_hlen));
    }

    if raw[9] != IP_PROTO_TCP {
        return Err(ParseError::NotTcp(raw[9]));
    }

    let total = u16::from_be_bytes([raw[2], raw[3]]) as usize;
    if total < ip_hlen + TCP_HLEN || total > raw.len() {
        return Err(ParseError::BadTotalLength {
            total,
            captured: raw.len(),
        });
    }

    let tcp = &raw[ip_hlen..total];
    let hdr = TcpHdr::read_from(tcp);
    let data_offset = hdr.hdrlen() as u8;
    if (data_offset as u16) < TCP_DATA_OFFSET || hdr.hdrlen_bytes() > tcp.len() {
        return Err(ParseError::BadDataOffset(data_offset));
    }

    Ok(TcpSegment {
        src_ip: Ipv4Addr::new(raw[12], raw[13], raw[14], raw[15]),
        dst_ip: Ipv4Addr::new(raw[16], raw[17], raw[18], raw[19]),
        src_port: hdr.src,
        dst_port: hdr.dest,
        seqno: hdr.seqno,
        ackno: hdr.ackno,
        data_offset,
        flags: TcpFlags::from_tcphdr(hdr.flags()),
        wnd: hdr.wnd,
        chksum: hdr.chksum,
        payload: tcp[hdr.hdrlen_bytes()..].to_vec(),
    })
}

/// Return the TCP bytes of a datagram whose IP header already parsed cleanly.
pub fn tcp_bytes(raw: &[u8]) -> &[u8] {
    let ip_hlen = (raw[0] & 0x0F) as usize * 4;
    let total = u16::from_be_bytes([raw[2], raw[3]]) as usize;
    &raw[ip_hlen..total]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip_proto::{self, Ipv4Hdr, IP_DEFAULT_TTL};

    const SRC: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);
    const DST: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 2);

    fn datagram(seg: &OutSegment) -> Vec<u8> {
        let ip = Ipv4Hdr::build(SRC, DST, seg.len(), 1, IP_DEFAULT_TTL).finalize_checksum();
        ip_proto::combine(&ip, seg.as_bytes())
    }

    #[test]
    fn test_segment_shape() {
        let payload = b"GET / HTTP/1.0\r\n\r\n";
        let seg = OutSegment::build(40000, 80, 1, 0, TCP_PSH | TCP_ACK, payload);
        let b = seg.as_bytes();
        assert_eq!(b.len(), 20 + payload.len());
        assert_eq!(b[12] >> 4, 5);
        assert_eq!(b[12] & 0x0F, 0);
        assert_eq!(b[13] & TCP_FLAGS, TCP_PSH | TCP_ACK);
        assert_eq!(&b[14..16], &[0xFF, 0xFF]);
        assert_eq!(&b[18..20], &[0, 0]);
        assert_eq!(&b[20..], payload);
    }

    #[test]
    fn test_header_fields_big_endian() {
        let seg = OutSegment::build(0x1234, 0x0050, 0xDEADBEEF, 0x01020304, TCP_SYN, &[]);
        let b = seg.as_bytes();
        assert_eq!(&b[0..4], &[0x12, 0x34, 0x00, 0x50]);
        assert_eq!(&b[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(&b[8..12], &[1, 2, 3, 4]);
        assert_eq!(seg.header().chksum, 0);
    }

    #[test]
    fn test_checksum_verifies_with_pseudo_header() {
        let seg = OutSegment::build(40000, 80, 7, 9, TCP_ACK, b"odd").finalize_checksum(SRC, DST);
        assert_ne!(seg.header().chksum, 0);
        assert!(checksum::verify_tcp(SRC, DST, seg.as_bytes()));
        assert!(!checksum::verify_tcp(SRC, Ipv4Addr::new(10, 0, 0, 9), seg.as_bytes()));
    }

    #[test]
    fn test_finalize_twice_is_stable() {
        let once = OutSegment::build(1, 2, 3, 4, TCP_ACK, b"xy").finalize_checksum(SRC, DST);
        let twice = once.clone().finalize_checksum(SRC, DST);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_built_packet() {
        let seg = OutSegment::build(80, 40000, 5000, 1001, TCP_SYN | TCP_ACK, &[])
            .finalize_checksum(SRC, DST);
        let parsed = parse(&datagram(&seg)).unwrap();

        assert_eq!(parsed.src_ip, SRC);
        assert_eq!(parsed.dst_ip, DST);
        assert_eq!(parsed.src_port, 80);
        assert_eq!(parsed.dst_port, 40000);
        assert_eq!(parsed.seqno, 5000);
        assert_eq!(parsed.ackno, 1001);
        assert_eq!(parsed.data_offset, 5);
        assert!(parsed.flags.syn && parsed.flags.ack);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_parse_skips_ip_options_and_padding() {
        let seg = OutSegment::build(80, 40000, 1, 2, TCP_ACK, b"hello").finalize_checksum(SRC, DST);
        let mut raw = Ipv4Hdr::build(SRC, DST, seg.len() + 4, 1, 64).as_bytes().to_vec();
        raw[0] = 0x46; // IHL 6: one word of options
        raw.extend_from_slice(&[1, 1, 1, 0]); // NOP NOP NOP EOL
        raw.extend_from_slice(seg.as_bytes());
        raw.extend_from_slice(&[0, 0, 0]); // link-layer padding

        let parsed = parse(&raw).unwrap();
        assert_eq!(parsed.payload, b"hello");
    }

    #[test]
    fn test_parse_honours_tcp_options() {
        let mut seg = OutSegment::build(80, 40000, 1, 2, TCP_ACK, &[2, 4, 5, 0xb4, b'h', b'i'])
            .as_bytes()
            .to_vec();
        seg[12] = 6 << 4; // one word of options
        let ip = Ipv4Hdr::build(SRC, DST, seg.len(), 1, 64);
        let parsed = parse(&ip_proto::combine(&ip, &seg)).unwrap();
        assert_eq!(parsed.data_offset, 6);
        assert_eq!(parsed.payload, b"hi");
    }

    #[test]
    fn test_parse_too_short() {
        assert_eq!(parse(&[]), Err(ParseError::TooShort(0)));
        assert_eq!(parse(&[0x45; 39]), Err(ParseError::TooShort(39)));
    }

    #[test]
    fn test_parse_rejects_nonsense() {
        let seg = OutSegment::build(80, 40000, 1, 2, TCP_ACK, &[]);
        let good = datagram(&seg);

        let mut v6 = good.clone();
        v6[0] = 0x65;
        assert_eq!(parse(&v6), Err(ParseError::NotIpv4(6)));

        let mut short_ihl = good.clone();
        short_ihl[0] = 0x44;
        assert_eq!(parse(&short_ihl), Err(ParseError::BadIpHeaderLength(16)));

        let mut udp = good.clone();
        udp[9] = 17;
        assert_eq!(parse(&udp), Err(ParseError::NotTcp(17)));

        let mut long = good.clone();
        long[2..4].copy_from_slice(&100u16.to_be_bytes());
        assert!(matches!(parse(&long), Err(ParseError::BadTotalLength { total: 100, .. })));

        let mut offset = good.clone();
        offset[IP_HLEN + 12] = 4 << 4;
        assert_eq!(parse(&offset), Err(ParseError::BadDataOffset(4)));

        let mut offset = good;
        offset[IP_HLEN + 12] = 15 << 4;
        assert_eq!(parse(&offset), Err(ParseError::BadDataOffset(15)));
    }

    #[test]
    fn test_hdr_flags_accessors() {
        let mut hdr = TcpHdr::read_from(&[0u8; 20]);
        hdr.set_hdrlen_flags(5, TCP_SYN | TCP_ACK);
        assert_eq!(hdr.hdrlen(), 5);
        assert_eq!(hdr.hdrlen_bytes(), 20);
        assert_eq!(hdr.flags(), TCP_SYN | TCP_ACK);
    }
}
