//! `rdt3`: RDT 3.0, the stop-and-wait alternating-bit protocol, over UDP.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────┐   DATA(bit)    ┌──────────┐
//!  │  Client  │───────────────▶│  Server  │──▶ Sink::deliver
//!  │ (Sender) │                │(Receiver)│
//!  └────┬─────┘◀───────────────└─────┬────┘
//!       │         ACK(bit)           │
//!  ┌────▼────────────────────────────▼────┐
//!  │  FaultModel  (loss / byte corruption)│
//!  └────┬─────────────────────────────────┘
//!       │ raw UDP datagrams
//!  ┌────▼──────┐
//!  │  Socket   │  (thin async wrapper around tokio UdpSocket)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]     : wire format and checksum verification
//! - [`state`]      : sequence bit and send-phase types
//! - [`sender`]     : stop-and-wait outbound state (no I/O)
//! - [`receiver`]   : alternating-bit inbound state (no I/O)
//! - [`timer`]      : RTT estimation and the retransmission timeout
//! - [`simulator`]  : lossy/corrupting channel for every transmission
//! - [`socket`]     : async UDP socket abstraction with bounded waits
//! - [`client`]     : the send/retransmit loop
//! - [`server`]     : the receive/ACK loop, one receiver per peer
//! - [`config`]     : startup parameters and their defaults
//! - [`throughput`] : goodput measurement around a run of sends

pub mod client;
pub mod config;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod server;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod throughput;
pub mod timer;

pub use client::{Client, ClientError, SendReport};
pub use config::{ClientConfig, ConfigError, ServerConfig};
pub use packet::{Corrupted, Packet, PacketError};
pub use server::{Server, ServerError, Sink, Step};
pub use simulator::{Fault, FaultModel, Impairment, ImpairmentConfig, Script};
pub use state::SeqBit;
