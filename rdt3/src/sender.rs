//! Outbound state for stop-and-wait reliability.
//!
//! [`Sender`] tracks the sequence bit, the single in-flight packet and the
//! RTT estimate.  It does **not** touch the socket;
//! [`crate::client::Client`] calls these methods and owns the actual
//! send/receive loop.
//!
//! # Stop-and-Wait contract
//! - At most **one** packet is in flight at any moment (`in_flight`).
//! - The packet is encoded once per payload; retransmissions reuse the bytes.
//! - On a verified ACK for the current bit: sample the RTT, flip the bit,
//!   clear `in_flight`.
//! - Every transmission increments `tx_count` and restarts the clock; the
//!   deadline it returns is the only one the caller waits against.
//! - Anything else (corrupted buffer, data packet, ACK for the other bit) is
//!   ignored and leaves the deadline where it was.

use std::time::{Duration, Instant};

use crate::packet::{self, Corrupted, Packet, PacketError};
use crate::state::{SendPhase, SeqBit};
use crate::timer::{RttConfig, RttEstimator};

/// A packet that has been sent but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Encoded packet, exactly as handed to the fault model each time.
    pub wire: Vec<u8>,
    /// How many times this packet has been transmitted (1 = first send).
    pub tx_count: u32,
    /// Time of the most recent transmission (for RTT sampling).
    pub sent_at: Instant,
}

/// What the sender made of one received buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Verified ACK for the in-flight bit; the round trip took `sample_rtt`.
    Accepted { sample_rtt: Duration },
    /// Failed decoding or checksum verification.
    Corrupted,
    /// An intact data packet; only ACKs travel towards the sender.
    NotAnAck,
    /// An intact ACK for the other bit, left over from the previous round.
    StaleAck(SeqBit),
    /// Nothing is in flight.
    Idle,
}

/// Stop-and-wait send-side state for one session.
#[derive(Debug)]
pub struct Sender {
    /// Bit of the packet being sent, or of the next one when idle.
    ///
    /// Flips only after a verified matching ACK.
    pub seq: SeqBit,

    pub phase: SendPhase,

    pub rtt: RttEstimator,

    /// The in-flight packet, or `None` when the sender is idle.
    pub in_flight: Option<InFlight>,
}

impl Sender {
    pub fn new(config: RttConfig) -> Self {
        Self {
            seq: SeqBit::Even,
            phase: SendPhase::Preparing,
            rtt: RttEstimator::new(config),
            in_flight: None,
        }
    }

    /// Encode `payload` with the current bit and make it the in-flight packet.
    ///
    /// Any packet still in flight is abandoned without flipping the bit, so
    /// the next payload reuses it.
    pub fn prepare(&mut self, payload: &[u8]) -> Result<&[u8], PacketError> {
        self.phase = SendPhase::Preparing;
        let wire = packet::encode_data(self.seq, payload)?;
        self.phase = SendPhase::AwaitingAck;
        let entry = self.in_flight.insert(InFlight {
            wire,
            tx_count: 0,
            sent_at: Instant::now(),
        });
        Ok(&entry.wire)
    }

    /// Note a (re)transmission of the in-flight packet and restart its clock.
    ///
    /// Called once per attempt, whether or not the fault model let the
    /// datagram through.  Returns the deadline for this attempt's ACK.
    pub fn on_transmit(&mut self) -> Instant {
        let now = Instant::now();
        if let Some(ref mut e) = self.in_flight {
            e.tx_count += 1;
            e.sent_at = now;
        }
        now + self.rtt.timeout()
    }

    /// Classify one received buffer.
    ///
    /// On [`AckOutcome::Accepted`] the RTT sample has already been recorded,
    /// the bit has flipped and the phase is [`SendPhase::Done`].
    pub fn on_response(&mut self, decoded: Result<Packet, Corrupted>) -> AckOutcome {
        let Some(entry) = self.in_flight.as_ref() else {
            return AckOutcome::Idle;
        };
        match decoded {
            Err(Corrupted) => AckOutcome::Corrupted,
            Ok(Packet::Data { .. }) => AckOutcome::NotAnAck,
            Ok(Packet::Ack { seq }) if seq != self.seq => AckOutcome::StaleAck(seq),
            Ok(Packet::Ack { .. }) => {
                let sample_rtt = entry.sent_at.elapsed();
                self.rtt.record_sample(sample_rtt);
                self.seq = self.seq.flip();
                self.in_flight = None;
                self.phase = SendPhase::Done;
                AckOutcome::Accepted { sample_rtt }
            }
        }
    }

    /// Transmissions of the in-flight packet so far, or `0` when idle.
    pub fn transmissions(&self) -> u32 {
        self.in_flight.as_ref().map_or(0, |e| e.tx_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{decode, encode_ack, encode_data};

    fn sender() -> Sender {
        Sender::new(RttConfig::default())
    }

    #[test]
    fn initial_state() {
        let s = sender();
        assert_eq!(s.seq, SeqBit::Even);
        assert_eq!(s.phase, SendPhase::Preparing);
        assert!(s.in_flight.is_none());
        assert_eq!(s.transmissions(), 0);
    }

    #[test]
    fn prepare_encodes_with_current_bit() {
        let mut s = sender();
        let wire = s.prepare(b"A").unwrap().to_vec();
        assert_eq!(
            decode(&wire),
            Ok(Packet::Data {
                seq: SeqBit::Even,
                payload: b"A".to_vec()
            })
        );
        assert_eq!(s.phase, SendPhase::AwaitingAck);
    }

    #[test]
    fn matching_ack_flips_bit_and_samples_rtt() {
        let mut s = sender();
        s.prepare(b"A").unwrap();
        s.on_transmit();

        let outcome = s.on_response(decode(&encode_ack(SeqBit::Even)));
        assert!(matches!(outcome, AckOutcome::Accepted { .. }));
        assert_eq!(s.seq, SeqBit::Odd);
        assert_eq!(s.phase, SendPhase::Done);
        assert!(s.in_flight.is_none());
        assert!(s.rtt.estimated_rtt.is_some());
    }

    #[test]
    fn stale_ack_is_ignored() {
        let mut s = sender();
        s.prepare(b"A").unwrap();
        s.on_transmit();

        let outcome = s.on_response(decode(&encode_ack(SeqBit::Odd)));
        assert_eq!(outcome, AckOutcome::StaleAck(SeqBit::Odd));
        assert_eq!(s.seq, SeqBit::Even);
        assert_eq!(s.phase, SendPhase::AwaitingAck);
        assert!(s.rtt.estimated_rtt.is_none());
    }

    #[test]
    fn corrupted_and_data_responses_are_ignored() {
        let mut s = sender();
        s.prepare(b"A").unwrap();
        s.on_transmit();

        let mut bad_ack = encode_ack(SeqBit::Even);
        bad_ack[6] ^= 0xFF;
        assert_eq!(s.on_response(decode(&bad_ack)), AckOutcome::Corrupted);

        let data = encode_data(SeqBit::Even, b"echo").unwrap();
        assert_eq!(s.on_response(decode(&data)), AckOutcome::NotAnAck);

        assert_eq!(s.seq, SeqBit::Even);
        assert!(s.rtt.estimated_rtt.is_none());
    }

    #[test]
    fn ignored_response_keeps_send_time() {
        let mut s = sender();
        s.prepare(b"A").unwrap();
        s.on_transmit();
        let before = s.in_flight.as_ref().unwrap().sent_at;

        s.on_response(decode(&encode_ack(SeqBit::Odd)));
        s.on_response(Err(Corrupted));
        let entry = s.in_flight.as_ref().unwrap();
        assert_eq!(entry.sent_at, before);
        assert_eq!(entry.tx_count, 1);
    }

    #[test]
    fn deadline_is_send_time_plus_timeout() {
        let mut s = sender();
        s.prepare(b"A").unwrap();
        let deadline = s.on_transmit();
        let sent_at = s.in_flight.as_ref().unwrap().sent_at;
        assert_eq!(deadline, sent_at + s.rtt.timeout());
    }

    #[test]
    fn retransmit_counts_and_reuses_bytes() {
        let mut s = sender();
        let first = s.prepare(b"payload").unwrap().to_vec();
        s.on_transmit();
        s.on_transmit();
        s.on_transmit();

        assert_eq!(s.transmissions(), 3);
        assert_eq!(s.in_flight.as_ref().unwrap().wire, first);
    }

    #[test]
    fn response_while_idle() {
        let mut s = sender();
        assert_eq!(
            s.on_response(decode(&encode_ack(SeqBit::Even))),
            AckOutcome::Idle
        );
        assert_eq!(s.seq, SeqBit::Even);
    }

    #[test]
    fn bit_alternates_across_payloads() {
        let mut s = sender();
        for (i, expected) in [SeqBit::Even, SeqBit::Odd, SeqBit::Even].into_iter().enumerate() {
            let wire = s.prepare(format!("msg-{i}").as_bytes()).unwrap().to_vec();
            assert_eq!(decode(&wire).unwrap().seq(), expected);
            s.on_transmit();
            s.on_response(decode(&encode_ack(expected)));
        }
        assert_eq!(s.seq, SeqBit::Odd);
    }
}
