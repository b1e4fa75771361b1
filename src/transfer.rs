//! HTTP GET Transfer
//!
//! Drives one connection from CLOSED back to CLOSED: active open, a single
//! request segment, response accumulation until the peer's FIN, and the
//! closing FIN+ACK. Packet building and state transitions live in
//! [`TcpTx`], [`TcpRx`] and the state components; this module only owns
//! the channel, the clocks and the response buffer.

use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Instant;

use log::{debug, info, trace, warn};

use crate::channel::RawChannel;
use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::random::RandomSource;
use crate::state::{TcpConnectionState, TcpState};
use crate::tcp_in::TcpRx;
use crate::tcp_out::TcpTx;
use crate::tcp_types::InputAction;

pub struct HttpGetTransfer<C, R> {
    channel: C,
    rng: R,
    cfg: TransferConfig,
    state: TcpConnectionState,
    local_ip: Ipv4Addr,
    remote: SocketAddrV4,
    response: Vec<u8>,
    recv_buf: Vec<u8>,
    /// Last time a segment of this connection arrived
    last_activity: Instant,
}

impl<C: RawChannel, R: RandomSource> HttpGetTransfer<C, R> {
    pub fn new(
        channel: C,
        rng: R,
        cfg: TransferConfig,
        local_ip: Ipv4Addr,
        remote: SocketAddrV4,
    ) -> Self {
        let recv_buf = vec![0u8; cfg.recv_buffer_len];
        Self {
            channel,
            rng,
            cfg,
            state: TcpConnectionState::new(),
            local_ip,
            remote,
            response: Vec::new(),
            recv_buf,
            last_activity: Instant::now(),
        }
    }

    pub fn state(&self) -> TcpState {
        self.state.state()
    }

    /// Local ephemeral port, 0 until the transfer has started
    pub fn local_port(&self) -> u16 {
        self.state.conn_mgmt.local_port
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Run the whole exchange and return the raw response bytes.
    ///
    /// `request` goes out in one PSH+ACK segment right after the handshake.
    pub fn run(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.connect()?;
        self.send_request(request)?;
        self.receive_response()
    }

    // ------------------------------------------------------------------------
    // Handshake
    // ------------------------------------------------------------------------

    fn connect(&mut self) -> Result<()> {
        let local_port = self.rng.ephemeral_port();
        let iss = self.rng.initial_sequence();

        self.state.conn_mgmt.on_connect(
            self.local_ip,
            local_port,
            *self.remote.ip(),
            self.remote.port(),
        )?;
        self.state.rod.on_connect(iss)?;

        info!(
            "connecting {}:{} -> {} (iss={})",
            self.local_ip, local_port, self.remote, iss
        );

        let mut attempt = 0;
        loop {
            let syn = TcpTx::syn(&self.state, self.rng.ip_identification(), &self.cfg)?;
            self.transmit(&syn)?;
            debug!("SYN sent seq={}", iss);

            let wait = self.cfg.syn_backoff(attempt);
            let deadline = Instant::now() + wait;
            while Instant::now() < deadline {
                match self.next_action()? {
                    Some(InputAction::Connected) => {
                        info!("handshake complete, irs={}", self.state.rod.irs);
                        return self.send_ack();
                    }
                    Some(InputAction::Refused) => {
                        warn!("{} refused the connection", self.remote);
                        return Err(TransferError::ConnectionRefused);
                    }
                    _ => {}
                }
            }

            if attempt >= self.cfg.syn_retries {
                let _ = self.state.conn_mgmt.on_abort();
                return Err(TransferError::HandshakeTimeout {
                    attempts: attempt + 1,
                });
            }
            attempt += 1;
            warn!(
                "no SYN+ACK within {:?}, retransmitting SYN ({}/{})",
                wait, attempt, self.cfg.syn_retries
            );
        }
    }

    fn send_request(&mut self, request: &[u8]) -> Result<()> {
        let ip_id = self.rng.ip_identification();
        let packet = match TcpTx::request(&self.state, request, ip_id, &self.cfg) {
            Ok(packet) => packet,
            Err(e) => {
                let _ = self.state.conn_mgmt.on_abort();
                return Err(e.into());
            }
        };
        self.transmit(&packet)?;
        self.state.rod.on_data_sent(request.len())?;
        info!("request sent, {} bytes", request.len());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Response
    // ------------------------------------------------------------------------

    fn receive_response(&mut self) -> Result<Vec<u8>> {
        self.last_activity = Instant::now();

        loop {
            if self.last_activity.elapsed() >= self.cfg.idle_timeout {
                let _ = self.state.conn_mgmt.on_abort();
                warn!(
                    "no segment for {:?}, giving up after {} byte(s)",
                    self.cfg.idle_timeout,
                    self.response.len()
                );
                return Err(TransferError::IdleTimeout {
                    partial: mem::take(&mut self.response),
                });
            }

            let Some(action) = self.next_action()? else {
                continue;
            };

            match action {
                InputAction::Deliver(payload) => {
                    debug!(
                        "{} byte(s) in order, rcv_nxt={}",
                        payload.len(),
                        self.state.rod.rcv_nxt
                    );
                    self.response.extend_from_slice(&payload);
                    if self.cfg.ack_data {
                        self.send_ack()?;
                    }
                }
                InputAction::SendAck => self.send_ack()?,
                InputAction::Fin(payload) => {
                    self.response.extend_from_slice(&payload);
                    info!("FIN received, {} byte(s) total", self.response.len());
                    self.close()?;
                    return Ok(mem::take(&mut self.response));
                }
                InputAction::Reset => {
                    warn!("connection reset by {}", self.remote);
                    return Err(TransferError::ConnectionReset {
                        partial: mem::take(&mut self.response),
                    });
                }
                InputAction::Accept
                | InputAction::Drop
                | InputAction::Connected
                | InputAction::Refused => {}
            }
        }
    }

    /// FIN_WAIT → CLOSED: acknowledge the peer's FIN with our own
    fn close(&mut self) -> Result<()> {
        let packet = TcpTx::fin_ack(&self.state, self.rng.ip_identification(), &self.cfg)?;
        self.transmit(&packet)?;
        self.state.conn_mgmt.on_finack_sent()?;
        debug!(
            "FIN+ACK sent seq={} ack={}",
            self.state.rod.snd_nxt, self.state.rod.rcv_nxt
        );
        Ok(())
    }

    fn send_ack(&mut self) -> Result<()> {
        let packet = TcpTx::ack(&self.state, self.rng.ip_identification(), &self.cfg)?;
        self.transmit(&packet)?;
        trace!("ACK sent ack={}", self.state.rod.rcv_nxt);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Channel
    // ------------------------------------------------------------------------

    fn transmit(&mut self, packet: &[u8]) -> Result<()> {
        match self.channel.send(*self.remote.ip(), packet) {
            Ok(_) => Ok(()),
            Err(e) => {
                let _ = self.state.conn_mgmt.on_abort();
                Err(TransferError::Send(e))
            }
        }
    }

    /// Read one datagram and run it through the RX path.
    ///
    /// `None` when nothing arrived, the datagram did not parse, or it belongs
    /// to another connection.
    fn next_action(&mut self) -> Result<Option<InputAction>> {
        let n = match self.channel.receive(&mut self.recv_buf) {
            Ok(n) => n,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                0
            }
            Err(e) => {
                let _ = self.state.conn_mgmt.on_abort();
                return Err(TransferError::Receive(e));
            }
        };
        if n == 0 {
            return Ok(None);
        }

        let seg = match TcpRx::parse_packet(&self.recv_buf[..n], self.cfg.verify_checksums) {
            Ok(seg) => seg,
            Err(e) => {
                trace!("skip {} byte datagram: {}", n, e);
                return Ok(None);
            }
        };
        if !self.state.conn_mgmt.matches(&seg) {
            return Ok(None);
        }

        self.last_activity = Instant::now();
        Ok(Some(TcpRx::process_segment(&mut self.state, seg)))
    }
}
