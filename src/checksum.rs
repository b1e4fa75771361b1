//! Internet Checksum
//!
//! RFC 1071 one's-complement sum, used for the IPv4 header and, together
//! with the pseudo-header of RFC 793, for TCP segments.

use std::net::Ipv4Addr;

use crate::ip_proto::IP_PROTO_TCP;

/// Pseudo-header length (src addr, dst addr, zero, protocol, TCP length)
pub const PSEUDO_HLEN: usize = 12;

/// Add `bytes` as big-endian 16-bit words to a running sum.
///
/// A trailing odd byte is the high byte of a word whose low byte is zero.
/// The carry out of bit 16 is folded back after every addition.
fn accumulate(mut sum: u32, bytes: &[u8]) -> u32 {
    let mut words = bytes.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
        sum = fold(sum);
    }
    if let [last] = words.remainder() {
        sum += (*last as u32) << 8;
        sum = fold(sum);
    }
    sum
}

#[inline]
fn fold(sum: u32) -> u32 {
    (sum & 0xFFFF) + (sum >> 16)
}

fn finish(sum: u32) -> u16 {
    !(fold(sum) as u16)
}

/// Compute the Internet checksum over `bytes`.
///
/// With the checksum field zeroed, writing the result into that field and
/// recomputing over the whole buffer yields zero.
pub fn compute_checksum(bytes: &[u8]) -> u16 {
    finish(accumulate(0, bytes))
}

/// Build the 12-byte TCP pseudo-header.
pub fn pseudo_header(src: Ipv4Addr, dst: Ipv4Addr, tcp_len: u16) -> [u8; PSEUDO_HLEN] {
    let mut hdr = [0u8; PSEUDO_HLEN];
    hdr[0..4].copy_from_slice(&src.octets());
    hdr[4..8].copy_from_slice(&dst.octets());
    hdr[8] = 0;
    hdr[9] = IP_PROTO_TCP;
    hdr[10..12].copy_from_slice(&tcp_len.to_be_bytes());
    hdr
}

/// Checksum of the pseudo-header concatenated with `segment`.
///
/// The pseudo-header is an even number of bytes, so summing it first and
/// the segment second is the same as summing the concatenation.
pub fn tcp_checksum(src: Ipv4Addr, dst: Ipv4Addr, segment: &[u8]) -> u16 {
    let pseudo = pseudo_header(src, dst, segment.len() as u16);
    finish(accumulate(accumulate(0, &pseudo), segment))
}

/// True if a TCP segment (checksum field included) verifies against its pseudo-header.
pub fn verify_tcp(src: Ipv4Addr, dst: Ipv4Addr, segment: &[u8]) -> bool {
    tcp_checksum(src, dst, segment) == 0
}
