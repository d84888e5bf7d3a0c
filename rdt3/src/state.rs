//! Finite-state-machine types shared by both ends of the protocol.
//!
//! The alternating-bit protocol keeps "whose turn it is" as a single bit on
//! each side.  Neither side ever sees the other's bit directly; the two only
//! stay in lockstep through the data/ACK exchange.  Making the bit an enum
//! keeps it from being confused with any other integer on the wire.
//!
//! State transitions are *not* implemented here: they live in
//! [`crate::sender`] and [`crate::receiver`].

use std::fmt;

/// The 1-bit sequence number of the alternating-bit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SeqBit {
    /// Sequence bit `0`.  Both sides start here.
    #[default]
    Even,
    /// Sequence bit `1`.
    Odd,
}

impl SeqBit {
    /// The other bit.
    pub fn flip(self) -> Self {
        match self {
            Self::Even => Self::Odd,
            Self::Odd => Self::Even,
        }
    }

    /// Numeric value of the bit (`0` or `1`).
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Even => 0,
            Self::Odd => 1,
        }
    }
}

impl fmt::Display for SeqBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Phase of one `send` call on the sending side.
///
/// ```text
///  PREPARING ──encode──▶ AWAITING_ACK ──matching ACK──▶ DONE
///                          │      ▲
///                          └──────┘
///              timeout / corrupt / stale ACK
/// ```
///
/// Every call to [`crate::client::Client::send`] walks through this diagram
/// once; `Done` is terminal for that call and the next call starts again at
/// `Preparing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPhase {
    /// No packet in flight; the next payload has not been encoded yet.
    #[default]
    Preparing,
    /// A data packet has been encoded and is waiting for its ACK.
    AwaitingAck,
    /// The in-flight packet was acknowledged and the bit has flipped.
    Done,
}

impl fmt::Display for SendPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Preparing => "PREPARING",
            Self::AwaitingAck => "AWAITING_ACK",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}
