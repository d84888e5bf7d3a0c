//! Async UDP socket abstraction.
//!
//! [`Socket`] is a thin wrapper around `tokio::net::UdpSocket` that moves
//! opaque byte buffers.  Decoding, fault injection and all protocol logic
//! live elsewhere; this module owns only byte I/O and the bounded wait.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout_at, Instant};

/// Maximum UDP payload size (theoretical limit; in practice kept much smaller).
const MAX_DATAGRAM: usize = 65_535;

/// Errors that can arise from socket operations.
#[derive(Debug, Error)]
pub enum SocketError {
    /// Underlying I/O error from the OS.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A host name did not resolve to any address.
    #[error("could not resolve {0}")]
    Unresolved(String),
}

/// Result of a bounded wait for the next datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recv {
    /// A datagram arrived before the deadline.
    Datagram { bytes: Vec<u8>, from: SocketAddr },
    /// The deadline passed first.
    TimedOut,
}

/// An async, datagram-oriented UDP socket.
///
/// All methods are `&self` so the socket can be shared across tasks if needed.
#[derive(Debug)]
pub struct Socket {
    /// Address this socket is bound to (filled in after OS assigns ephemeral port).
    pub local_addr: SocketAddr,
    inner: UdpSocket,
}

impl Socket {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> Result<Self, SocketError> {
        let inner = UdpSocket::bind(local_addr).await?;
        let local_addr = inner.local_addr()?;
        Ok(Self { local_addr, inner })
    }

    /// Send `bytes` as a single UDP datagram to `dest`.
    pub async fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<(), SocketError> {
        self.inner.send_to(bytes, dest).await?;
        Ok(())
    }

    /// Wait for the next datagram, however long it takes.
    pub async fn recv_from(&self) -> Result<(Vec<u8>, SocketAddr), SocketError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (n, addr) = self.inner.recv_from(&mut buf).await?;
        buf.truncate(n);
        Ok((buf, addr))
    }

    /// Wait for the next datagram until `deadline`.
    ///
    /// A deadline already in the past still polls the socket once, so a
    /// datagram that is already queued is returned rather than reported as a
    /// timeout.
    pub async fn recv_until(&self, deadline: Instant) -> Result<Recv, SocketError> {
        match timeout_at(deadline, self.recv_from()).await {
            Ok(Ok((bytes, from))) => Ok(Recv::Datagram { bytes, from }),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Ok(Recv::TimedOut),
        }
    }
}

/// Resolve `host:port` to its first socket address.
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, SocketError> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| SocketError::Unresolved(format!("{host}:{port}")))
}
