//! Receiving side: the unbounded receive/ACK loop.
//!
//! A [`Server`] owns the socket, the fault model applied to outgoing ACKs,
//! and one [`Receiver`] per peer address.  The protocol carries no connection
//! identifier, so the peer address *is* the session key: two senders never
//! share an expected bit.
//!
//! Accepted payloads go to a [`Sink`], exactly once per accepted bit
//! transition; duplicates only trigger a repeated ACK.

use std::collections::HashMap;
use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{ConfigError, ServerConfig};
use crate::packet::{self, Corrupted, Packet};
use crate::receiver::{Receiver, Verdict};
use crate::simulator::{FaultModel, Impairment};
use crate::socket::{self, Socket, SocketError};
use crate::state::SeqBit;

/// Consumer of delivered application data.
pub trait Sink {
    fn deliver(&mut self, payload: Vec<u8>);
}

impl Sink for Vec<Vec<u8>> {
    fn deliver(&mut self, payload: Vec<u8>) {
        self.push(payload);
    }
}

impl Sink for mpsc::UnboundedSender<Vec<u8>> {
    fn deliver(&mut self, payload: Vec<u8>) {
        // A closed channel only means nobody is listening any more.
        if self.send(payload).is_err() {
            log::debug!("[server] sink closed; payload discarded");
        }
    }
}

/// What [`Server::step`] did with one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// New payload delivered; ACK(`ack`) handed to the fault model.
    Delivered { from: SocketAddr, ack: SeqBit },
    /// Duplicate data; ACK(`ack`) for the previous bit handed to the fault
    /// model.
    Reacked { from: SocketAddr, ack: SeqBit },
    /// Corrupted datagram dropped without feedback.
    Corrupted { from: SocketAddr },
    /// ACK received by the server and dropped.
    StrayAck { from: SocketAddr },
}

/// Errors from setting up a [`Server`].
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A receiver session listening on one socket.
pub struct Server<F = Impairment> {
    socket: Socket,
    faults: F,
    peers: HashMap<SocketAddr, Receiver>,
}

impl Server<Impairment> {
    /// Bind the configured address and use a randomly seeded [`Impairment`]
    /// with the configured rates.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let faults = Impairment::new(config.impairment);
        Self::bind_with(config, faults).await
    }
}

impl<F: FaultModel> Server<F> {
    /// Like [`Server::bind`], but with a caller-supplied fault model.
    pub async fn bind_with(config: ServerConfig, faults: F) -> Result<Self, ServerError> {
        config.validate()?;
        let addr = socket::resolve(&config.host, config.port).await?;
        let socket = Socket::bind(addr).await?;
        Ok(Self::new(socket, faults))
    }

    pub fn new(socket: Socket, faults: F) -> Self {
        log::info!("[server] listening on {}", socket.local_addr);
        Self {
            socket,
            faults,
            peers: HashMap::new(),
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr
    }

    /// Receive state for `peer`, if it has sent anything yet.
    pub fn peer(&self, peer: &SocketAddr) -> Option<&Receiver> {
        self.peers.get(peer)
    }

    /// Serve forever.  Returns only on a transport error.
    pub async fn serve<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<(), SocketError> {
        loop {
            self.step(sink).await?;
        }
    }

    /// Receive and fully process one datagram.
    pub async fn step<S: Sink + ?Sized>(&mut self, sink: &mut S) -> Result<Step, SocketError> {
        let (bytes, from) = self.socket.recv_from().await?;

        // Only intact data opens a session; noise from unknown addresses
        // leaves no state behind.
        let verdict = match packet::decode(&bytes) {
            Err(Corrupted) => Verdict::Corrupted,
            Ok(Packet::Ack { .. }) => Verdict::StrayAck,
            data => self
                .peers
                .entry(from)
                .or_insert_with(|| {
                    log::info!("[server] new peer {from}");
                    Receiver::new()
                })
                .on_packet(data),
        };
        let ack = verdict.ack();
        let step = match verdict {
            Verdict::Corrupted => {
                log::debug!("[server] corrupted datagram from {from}; discarded");
                Step::Corrupted { from }
            }
            Verdict::StrayAck => {
                log::debug!("[server] ACK from {from} ignored");
                Step::StrayAck { from }
            }
            Verdict::Deliver { payload, ack } => {
                log::debug!("[server] ← DATA seq={ack} len={} from {from}", payload.len());
                sink.deliver(payload);
                Step::Delivered { from, ack }
            }
            Verdict::Duplicate { ack } => {
                log::debug!("[server] duplicate from {from}; re-sending ACK seq={ack}");
                Step::Reacked { from, ack }
            }
        };

        if let Some(ack) = ack {
            match self.faults.apply(&packet::encode_ack(ack)) {
                None => log::debug!("[server] simulated loss of ACK seq={ack}; not sent"),
                Some(wire) => {
                    self.socket.send_to(&wire, from).await?;
                    log::debug!("[server] → ACK seq={ack} to {from}");
                }
            }
        }
        Ok(step)
    }
}
