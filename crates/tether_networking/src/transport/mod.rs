//! # Transport Binding
//!
//! Point-to-point message delivery keyed by packet type. The replication
//! core only needs:
//!
//! - message boundaries preserved (one `send` is one `recv`)
//! - a channel per [`PacketType`] so each can be drained separately
//! - reliable and unreliable delivery
//!
//! Everything else (sockets, relays, lobbies) belongs to the implementation.
//! [`LoopbackHub`] is the in-process implementation used by tests and the LAN
//! runner.

mod conditions;
mod loopback;

pub use conditions::NetworkConditions;
pub use loopback::{LoopbackHub, LoopbackTransport};

use crate::error::TransportError;
use tether_shared::{PacketType, PeerId, Reliability};

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Messages handed to the network.
    pub packets_sent: u64,
    /// Messages delivered to this peer.
    pub packets_received: u64,
    /// Payload bytes sent.
    pub bytes_sent: u64,
    /// Payload bytes received.
    pub bytes_received: u64,
    /// Unreliable messages lost on purpose by [`NetworkConditions`].
    pub packets_dropped: u64,
    /// Unreliable messages delivered twice by [`NetworkConditions`].
    pub packets_duplicated: u64,
}

/// Message delivery between peers.
pub trait Transport {
    /// Identity of this end.
    fn local_peer(&self) -> PeerId;

    /// Queues `bytes` for `to` on channel `kind`.
    ///
    /// # Errors
    ///
    /// [`TransportError`] if `to` is unknown or the connection was closed.
    fn send(
        &mut self,
        to: PeerId,
        kind: PacketType,
        bytes: &[u8],
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    /// Next buffered message on channel `kind`, without blocking.
    fn recv(&mut self, kind: PacketType) -> Option<(PeerId, Vec<u8>)>;

    /// Closes the connection to `peer`. Later traffic either way is refused.
    fn close(&mut self, peer: PeerId);
}
