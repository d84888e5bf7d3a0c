//! Wire-format definitions for data and ACK packets.
//!
//! Every datagram exchanged between peers is a [`Packet`].  This module is
//! responsible for:
//! - Defining the on-wire binary layout (kind, sequence bit, length, checksum).
//! - Serialising data and ACK packets into byte buffers ready for transmission.
//! - Deserialising a raw byte slice back into a [`Packet`], classifying every
//!   failure as [`Corrupted`].
//!
//! No I/O happens here; this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |     Kind      |   Sequence    |        Payload Length         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Checksum (CRC-32)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Payload ...                            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Total header size: [`HEADER_LEN`] = 8 bytes.
//!
//! The checksum of a data packet covers the payload only.  The checksum of an
//! ACK covers the text `ack:<bit>`, so both ends can compute it from the bit
//! alone.  Neither covers the header, which is instead protected by its code
//! points: the two kinds and the two sequence values are far enough apart
//! that no single flipped bit or complemented byte maps one valid value onto
//! another.

use thiserror::Error;

use crate::state::SeqBit;

/// Code points for the `kind` header byte.
pub mod kind {
    /// Data packet (`'D'`).
    pub const DATA: u8 = 0x44;
    /// Acknowledgement (`'A'`).
    pub const ACK: u8 = 0x41;
}

/// Code points for the `seq` header byte.
pub mod seq {
    /// Sequence bit `0`.
    pub const EVEN: u8 = 0x33;
    /// Sequence bit `1`.
    pub const ODD: u8 = 0x55;
}

/// Byte length of the fixed-size header on the wire.
pub const HEADER_LEN: usize = 8;

/// Largest payload that still fits into one IPv4 UDP datagram.
pub const MAX_PAYLOAD: usize = 65_507 - HEADER_LEN;

const OFF_KIND: usize = 0;
const OFF_SEQ: usize = 1;
const OFF_PAYLOAD_LEN: usize = 2;
const OFF_CHECKSUM: usize = 4;

/// A decoded, checksum-verified packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// Application data carrying one sequence bit.
    Data { seq: SeqBit, payload: Vec<u8> },
    /// Acknowledgement of the data packet with the same bit.
    Ack { seq: SeqBit },
}

impl Packet {
    /// Sequence bit carried by either variant.
    pub fn seq(&self) -> SeqBit {
        match self {
            Packet::Data { seq, .. } | Packet::Ack { seq } => *seq,
        }
    }

    /// `true` for [`Packet::Ack`].
    pub fn is_ack(&self) -> bool {
        matches!(self, Packet::Ack { .. })
    }
}

/// Errors that can arise when building a packet.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    /// The payload does not fit into a single datagram.
    #[error("payload of {len} bytes exceeds the {max}-byte limit", max = MAX_PAYLOAD)]
    PayloadTooLarge { len: usize },
}

/// A received buffer failed structural decoding or checksum verification.
///
/// The protocol never distinguishes the two: a truncated buffer and a
/// flipped payload byte are both just "corrupted".
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("packet corrupted")]
pub struct Corrupted;

/// Encode a data packet; the checksum covers `payload` only.
pub fn encode_data(seq: SeqBit, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
    let len = u16::try_from(payload.len())
        .ok()
        .filter(|_| payload.len() <= MAX_PAYLOAD)
        .ok_or(PacketError::PayloadTooLarge { len: payload.len() })?;

    let mut buf = header(kind::DATA, seq, len, crc32fast::hash(payload));
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Encode an ACK for `seq`; the checksum covers the text `ack:<bit>`.
pub fn encode_ack(seq: SeqBit) -> Vec<u8> {
    header(kind::ACK, seq, 0, ack_checksum(seq))
}

/// Parse and verify a received buffer.
///
/// Returns [`Corrupted`] if:
/// - `buf` is shorter than [`HEADER_LEN`],
/// - the kind or sequence byte is not a known code point,
/// - the `payload_len` field disagrees with the bytes that follow, or
/// - the checksum does not match the content selected by the kind.
pub fn decode(buf: &[u8]) -> Result<Packet, Corrupted> {
    if buf.len() < HEADER_LEN {
        return Err(Corrupted);
    }

    let seq = match buf[OFF_SEQ] {
        seq::EVEN => SeqBit::Even,
        seq::ODD => SeqBit::Odd,
        _ => return Err(Corrupted),
    };
    let payload_len =
        u16::from_be_bytes([buf[OFF_PAYLOAD_LEN], buf[OFF_PAYLOAD_LEN + 1]]) as usize;
    if buf.len() != HEADER_LEN + payload_len {
        return Err(Corrupted);
    }
    let checksum = u32::from_be_bytes([
        buf[OFF_CHECKSUM],
        buf[OFF_CHECKSUM + 1],
        buf[OFF_CHECKSUM + 2],
        buf[OFF_CHECKSUM + 3],
    ]);
    let payload = &buf[HEADER_LEN..];

    match buf[OFF_KIND] {
        kind::DATA if crc32fast::hash(payload) == checksum => Ok(Packet::Data {
            seq,
            payload: payload.to_vec(),
        }),
        kind::ACK if payload.is_empty() && ack_checksum(seq) == checksum => {
            Ok(Packet::Ack { seq })
        }
        _ => Err(Corrupted),
    }
}

fn header(kind: u8, bit: SeqBit, payload_len: u16, checksum: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload_len as usize);
    buf.push(kind);
    buf.push(match bit {
        SeqBit::Even => seq::EVEN,
        SeqBit::Odd => seq::ODD,
    });
    buf.extend_from_slice(&payload_len.to_be_bytes());
    buf.extend_from_slice(&checksum.to_be_bytes());
    buf
}

fn ack_checksum(seq: SeqBit) -> u32 {
    crc32fast::hash(format!("ack:{seq}").as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_decodes_to_same_content() {
        let bytes = encode_data(SeqBit::Odd, b"hello").unwrap();
        assert_eq!(
            decode(&bytes),
            Ok(Packet::Data {
                seq: SeqBit::Odd,
                payload: b"hello".to_vec()
            })
        );
    }

    #[test]
    fn ack_decodes_with_its_bit() {
        for bit in [SeqBit::Even, SeqBit::Odd] {
            let pkt = decode(&encode_ack(bit)).unwrap();
            assert!(pkt.is_ack());
            assert_eq!(pkt.seq(), bit);
        }
    }

    #[test]
    fn empty_payload_is_valid_data() {
        let bytes = encode_data(SeqBit::Even, b"").unwrap();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(
            decode(&bytes),
            Ok(Packet::Data {
                seq: SeqBit::Even,
                payload: vec![]
            })
        );
    }

    #[test]
    fn ack_checksum_is_over_canonical_text() {
        let bytes = encode_ack(SeqBit::Odd);
        let stored = u32::from_be_bytes(bytes[OFF_CHECKSUM..OFF_CHECKSUM + 4].try_into().unwrap());
        assert_eq!(stored, crc32fast::hash(b"ack:1"));
    }

    #[test]
    fn data_checksum_is_over_payload_only() {
        let bytes = encode_data(SeqBit::Even, b"abc").unwrap();
        let stored = u32::from_be_bytes(bytes[OFF_CHECKSUM..OFF_CHECKSUM + 4].try_into().unwrap());
        assert_eq!(stored, crc32fast::hash(b"abc"));
    }

    #[test]
    fn header_layout_on_wire() {
        let bytes = encode_data(SeqBit::Odd, &[7u8; 258]).unwrap();
        assert_eq!(bytes[OFF_KIND], kind::DATA);
        assert_eq!(bytes[OFF_SEQ], seq::ODD);
        assert_eq!(&bytes[OFF_PAYLOAD_LEN..OFF_PAYLOAD_LEN + 2], &[0x01, 0x02]);
        assert_eq!(bytes.len(), HEADER_LEN + 258);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert_eq!(
            encode_data(SeqBit::Even, &payload),
            Err(PacketError::PayloadTooLarge { len: MAX_PAYLOAD + 1 })
        );
        assert!(encode_data(SeqBit::Even, &payload[..MAX_PAYLOAD]).is_ok());
    }

    #[test]
    fn short_or_empty_buffer_is_corrupted() {
        assert_eq!(decode(&[]), Err(Corrupted));
        let bytes = encode_ack(SeqBit::Even);
        assert_eq!(decode(&bytes[..HEADER_LEN - 1]), Err(Corrupted));
    }

    #[test]
    fn truncated_payload_is_corrupted() {
        let mut bytes = encode_data(SeqBit::Even, b"data").unwrap();
        bytes.pop();
        assert_eq!(decode(&bytes), Err(Corrupted));
    }

    #[test]
    fn trailing_garbage_is_corrupted() {
        let mut bytes = encode_ack(SeqBit::Odd);
        bytes.push(0);
        assert_eq!(decode(&bytes), Err(Corrupted));
    }

    #[test]
    fn unknown_kind_is_corrupted() {
        let mut bytes = encode_data(SeqBit::Even, b"x").unwrap();
        bytes[OFF_KIND] = b'Z';
        assert_eq!(decode(&bytes), Err(Corrupted));
    }

    #[test]
    fn ack_for_other_bit_fails_checksum() {
        // Swapping the sequence code point of an ACK must not yield a valid
        // ACK for the other bit.
        let mut bytes = encode_ack(SeqBit::Even);
        bytes[OFF_SEQ] = seq::ODD;
        assert_eq!(decode(&bytes), Err(Corrupted));
    }

    /// Every single-bit flip anywhere in an encoded packet must be detected.
    #[test]
    fn every_single_bit_flip_is_detected() {
        let samples = [
            encode_data(SeqBit::Even, b"").unwrap(),
            encode_data(SeqBit::Odd, b"The quick brown fox").unwrap(),
            encode_data(SeqBit::Even, &(0..=255u8).collect::<Vec<_>>()).unwrap(),
            encode_ack(SeqBit::Even),
            encode_ack(SeqBit::Odd),
        ];
        for original in &samples {
            for i in 0..original.len() {
                for bit in 0..8 {
                    let mut bytes = original.clone();
                    bytes[i] ^= 1 << bit;
                    assert_eq!(decode(&bytes), Err(Corrupted), "byte {i} bit {bit}");
                }
            }
        }
    }

    /// The impairment simulator complements a whole byte; that must be
    /// detected too.
    #[test]
    fn every_byte_complement_is_detected() {
        let samples = [
            encode_data(SeqBit::Odd, b"payload").unwrap(),
            encode_ack(SeqBit::Even),
        ];
        for original in &samples {
            for i in 0..original.len() {
                let mut bytes = original.clone();
                bytes[i] ^= 0xFF;
                assert_eq!(decode(&bytes), Err(Corrupted), "byte {i}");
            }
        }
    }
}
