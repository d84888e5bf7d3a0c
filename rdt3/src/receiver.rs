//! Inbound state for the alternating-bit protocol.
//!
//! The [`Receiver`] is responsible for everything that happens *after* a raw
//! datagram is decoded and *before* the application sees its payload:
//! - Discarding corrupted buffers and stray ACKs without any feedback.
//! - Accepting the data packet that carries the expected bit.
//! - Detecting duplicates of the previous round (their ACK was lost) and
//!   asking for that ACK to be repeated, without re-delivering.
//!
//! The [`Receiver`] does **not** send ACKs itself; it returns a [`Verdict`]
//! that [`crate::server::Server`] turns into socket I/O.

use crate::packet::{Corrupted, Packet};
use crate::state::SeqBit;

/// What the caller must do with one received buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// New data: hand `payload` to the application, then send ACK(`ack`).
    Deliver { payload: Vec<u8>, ack: SeqBit },
    /// Duplicate of the previous round: only re-send ACK(`ack`).
    Duplicate { ack: SeqBit },
    /// Corrupted buffer; drop it silently.
    Corrupted,
    /// An ACK arrived at the receiving side; drop it silently.
    StrayAck,
}

impl Verdict {
    /// The ACK to send, if any.
    pub fn ack(&self) -> Option<SeqBit> {
        match self {
            Verdict::Deliver { ack, .. } | Verdict::Duplicate { ack } => Some(*ack),
            Verdict::Corrupted | Verdict::StrayAck => None,
        }
    }
}

/// Receive-side state for one peer.
#[derive(Debug, Default)]
pub struct Receiver {
    /// Bit of the next data packet that will be accepted.
    ///
    /// Flips only when that packet arrives intact.
    pub expected: SeqBit,

    /// Payloads handed to the application so far.
    pub delivered: u64,
}

impl Receiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one decoded (or undecodable) buffer.
    pub fn on_packet(&mut self, decoded: Result<Packet, Corrupted>) -> Verdict {
        match decoded {
            Err(Corrupted) => Verdict::Corrupted,
            Ok(Packet::Ack { .. }) => Verdict::StrayAck,
            Ok(Packet::Data { seq, payload }) if seq == self.expected => {
                self.expected = self.expected.flip();
                self.delivered += 1;
                Verdict::Deliver { payload, ack: seq }
            }
            // The sender is still on the previous bit: our ACK for it was
            // lost or damaged.  Repeat it.
            Ok(Packet::Data { .. }) => Verdict::Duplicate {
                ack: self.expected.flip(),
            },
        }
    }
}
