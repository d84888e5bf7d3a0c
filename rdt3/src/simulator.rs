//! Channel impairment simulator.
//!
//! Loopback UDP practically never loses or damages a datagram, so the
//! protocol's recovery paths would go untested.  Every transmission, data
//! packets from the client and ACKs from the server alike, therefore passes
//! through a [`FaultModel`] first:
//!
//! | Fault       | Description                                             |
//! |-------------|---------------------------------------------------------|
//! | Loss        | The datagram is never handed to the socket.             |
//! | Corruption  | One byte of the encoded buffer is complemented (^0xFF). |
//!
//! The loss decision is made first; a dropped datagram gets no corruption
//! draw.  [`Impairment`] makes both decisions from an injected random
//! source, which can be seeded for reproducible runs.  [`Script`] replays a
//! fixed list of decisions so tests can force exact scenarios.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Probabilities of the fault model.
///
/// Both are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpairmentConfig {
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a transmitted datagram has one byte flipped.
    pub corrupt_rate: f64,
}

impl ImpairmentConfig {
    /// A transparent channel: nothing is lost or corrupted.
    pub const PERFECT: Self = Self {
        loss_rate: 0.0,
        corrupt_rate: 0.0,
    };
}

impl Default for ImpairmentConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.1,
            corrupt_rate: 0.1,
        }
    }
}

/// Decides the fate of each outgoing datagram.
pub trait FaultModel {
    /// Returns the bytes to put on the wire, or `None` if the datagram is lost.
    fn apply(&mut self, wire: &[u8]) -> Option<Vec<u8>>;
}

/// Random loss and corruption driven by an injected random source.
#[derive(Debug, Clone)]
pub struct Impairment<R = StdRng> {
    pub config: ImpairmentConfig,
    rng: R,
}

impl Impairment<StdRng> {
    /// Random source seeded from the operating system.
    pub fn new(config: ImpairmentConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Reproducible random source.
    pub fn seeded(config: ImpairmentConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Impairment<R> {
    pub fn with_rng(config: ImpairmentConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// `true` with independent probability `p`.
    pub fn should_drop(&mut self, p: f64) -> bool {
        self.rng.random::<f64>() < p
    }

    /// With probability `p`, complement one uniformly chosen byte of `buf`.
    pub fn maybe_corrupt(&mut self, mut buf: Vec<u8>, p: f64) -> Vec<u8> {
        if self.rng.random::<f64>() < p && !buf.is_empty() {
            let idx = self.rng.random_range(0..buf.len());
            buf[idx] ^= 0xFF;
        }
        buf
    }
}

impl<R: Rng> FaultModel for Impairment<R> {
    fn apply(&mut self, wire: &[u8]) -> Option<Vec<u8>> {
        if self.should_drop(self.config.loss_rate) {
            return None;
        }
        Some(self.maybe_corrupt(wire.to_vec(), self.config.corrupt_rate))
    }
}

/// One scripted decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Transmit unchanged.
    Pass,
    /// Do not transmit.
    Drop,
    /// Transmit with the byte at this index complemented.
    ///
    /// Indices past the end of the buffer wrap around.
    Corrupt(usize),
}

/// Replays a fixed sequence of [`Fault`]s, one per transmission.
///
/// Once the script runs out every further datagram passes untouched.
#[derive(Debug, Clone, Default)]
pub struct Script {
    faults: VecDeque<Fault>,
}

impl Script {
    pub fn new(faults: impl IntoIterator<Item = Fault>) -> Self {
        Self {
            faults: faults.into_iter().collect(),
        }
    }

    /// Number of decisions not yet consumed.
    pub fn remaining(&self) -> usize {
        self.faults.len()
    }
}

impl FaultModel for Script {
    fn apply(&mut self, wire: &[u8]) -> Option<Vec<u8>> {
        match self.faults.pop_front().unwrap_or(Fault::Pass) {
            Fault::Pass => Some(wire.to_vec()),
            Fault::Drop => None,
            Fault::Corrupt(_) if wire.is_empty() => Some(Vec::new()),
            Fault::Corrupt(idx) => {
                let mut buf = wire.to_vec();
                let idx = idx % buf.len();
                buf[idx] ^= 0xFF;
                Some(buf)
            }
        }
    }
}
