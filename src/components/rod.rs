//! Reliable Ordered Delivery Component
//!
//! Handles sequence numbers and ACKs.

use crate::tcp_types::TcpSegment;

/// Reliable Ordered Delivery State
///
/// Only ROD event handlers can write to this state.
pub struct ReliableOrderedDeliveryState {
    /* Local & Remote Sequence Numbers */
    pub snd_nxt: u32,      // Next sequence number we will send
    pub rcv_nxt: u32,      // Next sequence number we expect from peer

    /* Initial Sequence Numbers (for handshake) */
    pub iss: u32,          // Our initial send sequence number
    pub irs: u32,          // Peer's initial receive sequence number
}

impl ReliableOrderedDeliveryState {
    pub fn new() -> Self {
        Self {
            snd_nxt: 0,
            rcv_nxt: 0,
            iss: 0,
            irs: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Connection Setup (Handshake)
    // ------------------------------------------------------------------------

    /// CLOSED → SYN_SENT: Take the initial sequence number for active open
    pub fn on_connect(&mut self, iss: u32) -> Result<(), &'static str> {
        self.iss = iss;
        self.snd_nxt = iss;
        self.irs = 0;
        self.rcv_nxt = 0;

        Ok(())
    }

    /// SYN_SENT → ESTABLISHED: Process SYN+ACK, update sequence numbers
    pub fn on_synack_in_synsent(&mut self, seg: &TcpSegment) -> Result<(), &'static str> {
        // Validate ACK is for our SYN
        if seg.ackno != self.iss.wrapping_add(1) {
            return Err("Invalid ACK number");
        }

        // Store peer's initial sequence number
        self.irs = seg.seqno;
        self.rcv_nxt = seg.seqno.wrapping_add(1);

        // Update our sequence number (SYN is now ACKed)
        self.snd_nxt = self.iss.wrapping_add(1);

        Ok(())
    }

    /// True if `seg` is a RST answering our SYN (RFC 793: ack must cover the SYN)
    pub fn is_rst_for_syn(&self, seg: &TcpSegment) -> bool {
        seg.flags.rst && seg.flags.ack && seg.ackno == self.iss.wrapping_add(1)
    }

    // ------------------------------------------------------------------------
    // Data Path (ESTABLISHED)
    // ------------------------------------------------------------------------

    /// ESTABLISHED: Our request payload has been handed to the channel
    pub fn on_data_sent(&mut self, len: usize) -> Result<(), &'static str> {
        self.snd_nxt = self.snd_nxt.wrapping_add(len as u32);
        Ok(())
    }

    /// True if `ackno` lies in `[iss+1, snd_nxt]`
    pub fn acceptable_ack(&self, ackno: u32) -> bool {
        let una = self.iss.wrapping_add(1);
        ackno.wrapping_sub(una) <= self.snd_nxt.wrapping_sub(una)
    }

    /// True if `seg` starts exactly at `rcv_nxt`
    pub fn in_order(&self, seg: &TcpSegment) -> bool {
        seg.seqno == self.rcv_nxt
    }

    /// True if `seg` starts at or after `rcv_nxt` (modulo 2^32)
    pub fn at_or_after_rcv_nxt(&self, seg: &TcpSegment) -> bool {
        (seg.seqno.wrapping_sub(self.rcv_nxt) as i32) >= 0
    }

    /// ESTABLISHED: Validate the ACK of an incoming segment
    pub fn on_ack_in_established(&self, seg: &TcpSegment) -> Result<(), &'static str> {
        if !self.acceptable_ack(seg.ackno) {
            return Err("ACK outside the send window");
        }

        Ok(())
    }

    /// ESTABLISHED: Consume an in-order payload, advance rcv_nxt
    pub fn on_data_in_established(&mut self, seg: &TcpSegment) -> Result<(), &'static str> {
        if !self.in_order(seg) {
            return Err("Segment not at rcv_nxt");
        }

        self.rcv_nxt = self.rcv_nxt.wrapping_add(seg.payload_len());

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Connection Teardown (Close)
    // ------------------------------------------------------------------------

    /// ESTABLISHED → FIN_WAIT: Process FIN, move rcv_nxt past it
    ///
    /// Any FIN at or after `rcv_nxt` ends the transfer, even beyond a gap;
    /// a FIN before `rcv_nxt` is a retransmission.
    pub fn on_fin_in_established(&mut self, seg: &TcpSegment) -> Result<(), &'static str> {
        if !self.at_or_after_rcv_nxt(seg) {
            return Err("FIN before rcv_nxt");
        }

        // Payload first, then the FIN's own sequence number
        self.rcv_nxt = seg.seqno.wrapping_add(seg.payload_len()).wrapping_add(1);

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Reset Handling
    // ------------------------------------------------------------------------

    /// True if a RST's sequence number is the one we expect next (RFC 5961)
    pub fn rst_in_window(&self, seg: &TcpSegment) -> bool {
        seg.seqno == self.rcv_nxt
    }

    /// ANY → CLOSED: Reset sequence numbers
    pub fn on_rst(&mut self) -> Result<(), &'static str> {
        self.snd_nxt = 0;
        self.rcv_nxt = 0;

        Ok(())
    }
}

impl Default for ReliableOrderedDeliveryState {
    fn default() -> Self {
        Self::new()
    }
}
