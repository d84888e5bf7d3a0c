//! Sending side: the stop-and-wait send/retransmit loop.
//!
//! A [`Client`] owns the socket, the fault model and the [`Sender`] state for
//! one session with one server.  [`Client::send`] resolves completely (the
//! payload is acknowledged) before it returns, so successive calls are
//! strictly serialised and the sequence bit and RTT estimate carry over from
//! one call to the next.
//!
//! ```ignore
//! let mut client = Client::connect(ClientConfig::default()).await?;
//! client.send(b"hello").await?;
//! client.send(b"world").await?;
//! ```

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

use crate::config::{ClientConfig, ConfigError};
use crate::packet::{self, PacketError};
use crate::sender::{AckOutcome, Sender};
use crate::simulator::{FaultModel, Impairment};
use crate::socket::{self, Recv, Socket, SocketError};
use crate::state::SeqBit;

/// Errors surfaced by [`Client`].
///
/// Lost, corrupted and stale responses are never errors; they are handled
/// inside [`Client::send`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The configured transmission limit was reached without a valid ACK.
    #[error("no ACK for seq={seq} after {transmissions} transmissions")]
    RetriesExhausted { seq: SeqBit, transmissions: u32 },
}

/// Summary of one completed [`Client::send`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendReport {
    /// Bit the payload was sent with.
    pub seq: SeqBit,
    /// Transmission attempts, including ones the fault model dropped.
    pub transmissions: u32,
    /// Round trip of the attempt that was acknowledged.
    pub sample_rtt: Duration,
    /// Timeout that will govern the next payload.
    pub timeout_after: Duration,
}

/// A sender session bound to one server address.
pub struct Client<F = Impairment> {
    pub sender: Sender,
    socket: Socket,
    server: SocketAddr,
    faults: F,
    max_transmissions: Option<u32>,
}

impl Client<Impairment> {
    /// Resolve the configured server, bind an ephemeral socket and use a
    /// randomly seeded [`Impairment`] with the configured rates.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let faults = Impairment::new(config.impairment);
        Self::connect_with(config, faults).await
    }
}

impl<F: FaultModel> Client<F> {
    /// Like [`Client::connect`], but with a caller-supplied fault model.
    pub async fn connect_with(config: ClientConfig, faults: F) -> Result<Self, ClientError> {
        config.validate()?;
        let server = socket::resolve(&config.host, config.port).await?;
        let socket = Socket::bind(unspecified_for(server)).await?;
        Ok(Self::new(socket, server, &config, faults))
    }

    /// Assemble a client from parts; the impairment rates in `config` are
    /// ignored in favour of `faults`.
    pub fn new(socket: Socket, server: SocketAddr, config: &ClientConfig, faults: F) -> Self {
        Self {
            sender: Sender::new(config.rtt),
            socket,
            server,
            faults,
            max_transmissions: config.max_transmissions,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Bit the next payload will carry.
    pub fn seq(&self) -> SeqBit {
        self.sender.seq
    }

    /// Reliably deliver `payload` to the server.
    ///
    /// Retransmits the same encoded packet every time the timeout expires and
    /// returns only once an intact ACK for the current bit arrives (or the
    /// optional transmission limit is hit).
    pub async fn send(&mut self, payload: &[u8]) -> Result<SendReport, ClientError> {
        let seq = self.sender.seq;
        let wire = self.sender.prepare(payload)?.to_vec();

        loop {
            let sent = self.sender.transmissions();
            if self.max_transmissions.is_some_and(|limit| sent >= limit) {
                return Err(ClientError::RetriesExhausted {
                    seq,
                    transmissions: sent,
                });
            }
            let deadline = self.transmit(seq, &wire).await?;
            // Read now: an accepted ACK clears the in-flight entry.
            let transmissions = self.sender.transmissions();

            // Wait out this attempt's window.  Ignored responses do not
            // restart the clock.
            loop {
                let (bytes, from) = match self.socket.recv_until(deadline).await? {
                    Recv::Datagram { bytes, from } => (bytes, from),
                    Recv::TimedOut => {
                        log::warn!(
                            "[client] timeout after {:?}; retransmitting seq={seq}",
                            self.sender.rtt.timeout()
                        );
                        break;
                    }
                };
                if from != self.server {
                    log::debug!("[client] ignoring datagram from unknown peer {from}");
                    continue;
                }

                match self.sender.on_response(packet::decode(&bytes)) {
                    AckOutcome::Accepted { sample_rtt } => {
                        log::debug!("[client] ← ACK seq={seq}");
                        self.log_rtt(sample_rtt);
                        return Ok(SendReport {
                            seq,
                            transmissions,
                            sample_rtt,
                            timeout_after: self.sender.rtt.timeout(),
                        });
                    }
                    other => log::debug!(
                        "[client] ignoring response ({other:?}) while awaiting ACK seq={seq}"
                    ),
                }
            }
        }
    }

    /// One attempt: hand the bytes to the fault model, then start the clock.
    /// Returns the deadline for the ACK.
    async fn transmit(&mut self, seq: SeqBit, wire: &[u8]) -> Result<Instant, ClientError> {
        let attempt = self.sender.transmissions() + 1;
        match self.faults.apply(wire) {
            None => log::debug!("[client] simulated loss of seq={seq} attempt={attempt}; not sent"),
            Some(bytes) => {
                self.socket.send_to(&bytes, self.server).await?;
                log::debug!(
                    "[client] → DATA seq={seq} len={} attempt={attempt}",
                    bytes.len()
                );
            }
        }
        Ok(Instant::from_std(self.sender.on_transmit()))
    }

    fn log_rtt(&self, sample: Duration) {
        let rtt = &self.sender.rtt;
        log::info!(
            "[client] rtt sample={:.4}s estimated={:.4}s dev={:.4}s timeout={:.4}s",
            sample.as_secs_f64(),
            rtt.estimated_rtt.unwrap_or_default(),
            rtt.dev_rtt.unwrap_or_default(),
            rtt.timeout_interval
        );
    }
}

/// Wildcard local address of the same family as `server`.
fn unspecified_for(server: SocketAddr) -> SocketAddr {
    match server {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    }
}
