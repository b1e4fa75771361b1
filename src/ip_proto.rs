//! IPv4 Protocol Definitions
//!
//! Fixed 20-byte IPv4 header (no options) as emitted by this engine.

use std::net::Ipv4Addr;

use crate::checksum;

/// IPv4 header length (excluding options)
pub const IP_HLEN: usize = 20;

/// Version 4, IHL 5
pub const IP_VHL: u8 = 0x45;

/// Default time to live
pub const IP_DEFAULT_TTL: u8 = 64;

/// Protocol number for TCP
pub const IP_PROTO_TCP: u8 = 6;

/// Byte offset of the header checksum
const IP_CHKSUM_OFFSET: usize = 10;

/// IPv4 Header
///
/// Built once per packet, checksum-finalized, serialized, then dropped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ipv4Hdr {
    bytes: [u8; IP_HLEN],
}

impl Ipv4Hdr {
    /// Assemble a header for a datagram carrying `payload_len` bytes of TCP.
    ///
    /// The checksum bytes are left zero; call [`Ipv4Hdr::finalize_checksum`].
    /// `IP_HLEN + payload_len` must fit in a u16.
    pub fn build(src: Ipv4Addr, dst: Ipv4Addr, payload_len: usize, id: u16, ttl: u8) -> Self {
        let total_len = (IP_HLEN + payload_len) as u16;
        let mut bytes = [0u8; IP_HLEN];

        bytes[0] = IP_VHL;
        bytes[1] = 0; // TOS
        bytes[2..4].copy_from_slice(&total_len.to_be_bytes());
        bytes[4..6].copy_from_slice(&id.to_be_bytes());
        bytes[6] = 0; // flags / fragment offset
        bytes[7] = 0;
        bytes[8] = ttl;
        bytes[9] = IP_PROTO_TCP;
        bytes[10] = 0;
        bytes[11] = 0;
        bytes[12..16].copy_from_slice(&src.octets());
        bytes[16..20].copy_from_slice(&dst.octets());

        Self { bytes }
    }

    /// Zero the checksum bytes, sum the header, write the result back.
    ///
    /// Always re-zeroes first, so calling it again leaves the same value.
    pub fn finalize_checksum(mut self) -> Self {
        self.bytes[IP_CHKSUM_OFFSET] = 0;
        self.bytes[IP_CHKSUM_OFFSET + 1] = 0;
        let sum = checksum::compute_checksum(&self.bytes);
        self.bytes[IP_CHKSUM_OFFSET..IP_CHKSUM_OFFSET + 2].copy_from_slice(&sum.to_be_bytes());
        self
    }

    pub fn identification(&self) -> u16 {
        u16::from_be_bytes([self.bytes[4], self.bytes[5]])
    }

    pub fn checksum(&self) -> u16 {
        u16::from_be_bytes([self.bytes[10], self.bytes[11]])
    }

    pub fn as_bytes(&self) -> &[u8; IP_HLEN] {
        &self.bytes
    }
}

/// Concatenate a finalized IP header and TCP segment into one datagram.
pub fn combine(ip: &Ipv4Hdr, segment: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(IP_HLEN + segment.len());
    packet.extend_from_slice(ip.as_bytes());
    packet.extend_from_slice(segment);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: Ipv4Addr = Ipv4Addr::new(10, 1, 2, 3);
    const DST: Ipv4Addr = Ipv4Addr::new(93, 184, 216, 34);

    #[test]
    fn test_header_shape() {
        for payload_len in [0usize, 20, 57, 1460] {
            let hdr = Ipv4Hdr::build(SRC, DST, payload_len, 0xBEEF, IP_DEFAULT_TTL);
            let bytes = hdr.as_bytes();
            assert_eq!(bytes.len(), 20);
            assert_eq!(bytes[0], 0x45);
            assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) as usize, 20 + payload_len);
        }
    }

    #[test]
    fn test_fixed_fields() {
        let hdr = Ipv4Hdr::build(SRC, DST, 40, 0x1234, IP_DEFAULT_TTL);
        let b = hdr.as_bytes();
        assert_eq!(b[1], 0);
        assert_eq!(hdr.identification(), 0x1234);
        assert_eq!(&b[6..8], &[0, 0]);
        assert_eq!(b[8], 64);
        assert_eq!(b[9], 6);
        assert_eq!(hdr.checksum(), 0);
        assert_eq!(&b[12..16], &SRC.octets());
        assert_eq!(&b[16..20], &DST.octets());
    }

    #[test]
    fn test_checksum_verifies() {
        let hdr = Ipv4Hdr::build(SRC, DST, 33, 7, IP_DEFAULT_TTL).finalize_checksum();
        assert_ne!(hdr.checksum(), 0);
        assert_eq!(checksum::compute_checksum(hdr.as_bytes()), 0);
    }

    #[test]
    fn test_finalize_twice_is_stable() {
        let once = Ipv4Hdr::build(SRC, DST, 12, 99, IP_DEFAULT_TTL).finalize_checksum();
        let twice = once.finalize_checksum();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_combine() {
        let hdr = Ipv4Hdr::build(SRC, DST, 3, 1, IP_DEFAULT_TTL).finalize_checksum();
        let packet = combine(&hdr, &[1, 2, 3]);
        assert_eq!(packet.len(), 23);
        assert_eq!(&packet[20..], &[1, 2, 3]);
    }
}
