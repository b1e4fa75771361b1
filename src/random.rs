//! Randomness for ports, sequence numbers and IP identification
//!
//! Injected into the transfer so tests can pin every value.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// First port of the IANA dynamic range
pub const EPHEMERAL_PORT_BASE: u16 = 49152;

pub trait RandomSource {
    /// Local port for the connection, in `EPHEMERAL_PORT_BASE..=65535`
    fn ephemeral_port(&mut self) -> u16;

    /// Initial send sequence number
    fn initial_sequence(&mut self) -> u32;

    /// Identification field of the next IP header
    fn ip_identification(&mut self) -> u16;
}

/// [`RandomSource`] backed by any `rand` generator
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn ephemeral_port(&mut self) -> u16 {
        self.rng.gen_range(EPHEMERAL_PORT_BASE..=u16::MAX)
    }

    fn initial_sequence(&mut self) -> u32 {
        self.rng.gen()
    }

    fn ip_identification(&mut self) -> u16 {
        self.rng.gen()
    }
}

/// Fixed values; the identification counts up from its start value
#[derive(Debug, Clone)]
pub struct FixedSource {
    pub port: u16,
    pub iss: u32,
    pub next_id: u16,
}

impl FixedSource {
    pub fn new(port: u16, iss: u32) -> Self {
        Self {
            port,
            iss,
            next_id: 1,
        }
    }
}

impl RandomSource for FixedSource {
    fn ephemeral_port(&mut self) -> u16 {
        self.port
    }

    fn initial_sequence(&mut self) -> u32 {
        self.iss
    }

    fn ip_identification(&mut self) -> u16 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}
