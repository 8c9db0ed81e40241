//! # Networking Error Types
//!
//! Three tiers, matching how far a failure is allowed to travel:
//!
//! - [`CodecError`] aborts one message. The endpoint logs it and moves on,
//!   except for overflow on the write side, which is a sizing bug.
//! - [`AdmissionError`] refuses a joining peer.
//! - [`NetError`] escapes `Endpoint::tick` and stops the session.

use tether_core::MemoryError;
use tether_shared::{EntityType, PeerId};
use thiserror::Error;

/// Errors raised while encoding or decoding a message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer has no room for the next field.
    #[error("write overflow: need {needed} bytes, {remaining} remaining")]
    WriteOverflow {
        /// Size of the field being written.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The message ended before the field being read.
    #[error("read overflow: need {needed} bytes, {remaining} remaining")]
    ReadOverflow {
        /// Size of the field being read.
        needed: usize,
        /// Bytes left in the message.
        remaining: usize,
    },

    /// Channel number outside the packet enumeration.
    #[error("unknown packet type {0}")]
    UnknownPacketType(u8),

    /// Entity tag outside the type enumeration.
    #[error("unknown entity type {0}")]
    UnknownEntityType(u8),

    /// Tag has no payload layout (weapons and hitscans are index-only).
    #[error("entity type {0:?} is not replicated")]
    NotReplicated(EntityType),

    /// A small enum or flag byte holds an undefined value.
    #[error("invalid {what} value {value}")]
    UnknownEnum {
        /// Name of the field.
        what: &'static str,
        /// Value found on the wire.
        value: u8,
    },

    /// A value does not fit the bit width of its packed field.
    #[error("{field} value {value} does not fit its bit field")]
    BitFieldRange {
        /// Name of the field.
        field: &'static str,
        /// Offending value.
        value: u8,
    },

    /// A length-prefixed string is not valid UTF-8 or is too long.
    #[error("invalid string field")]
    InvalidString,

    /// A directive was decoded but bytes were left over.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

impl CodecError {
    /// Write-side overflow means a buffer was sized wrong.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::WriteOverflow { .. })
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection to this peer was closed.
    #[error("connection to {0} is closed")]
    Closed(PeerId),

    /// No route to this peer exists.
    #[error("unknown peer {0}")]
    UnknownPeer(PeerId),
}

/// Reasons a joining peer is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    /// The peer is on the ban list.
    #[error("{0} is banned")]
    Banned(PeerId),

    /// A peer with this identity is already in the session.
    #[error("{0} is already connected")]
    AlreadyConnected(PeerId),

    /// The session is at capacity.
    #[error("session is full ({0} peers)")]
    SessionFull(usize),

    /// The peer's player id already names another entity.
    #[error("{0} collides with an existing entity id")]
    IdInUse(PeerId),
}

/// Errors that stop an endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetError {
    /// Outgoing message did not fit its buffer.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    /// The tick's message budget ran out.
    #[error("memory: {0}")]
    Memory(#[from] MemoryError),
}

/// Result type for endpoint operations.
pub type NetResult<T> = Result<T, NetError>;
