//! # Wire Protocol
//!
//! Byte-level encoding shared by every message.
//!
//! ## Message Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ channel = PacketType (carried by the transport, not inline)  │
//! ├──────────────────────────────────────────────────────────────┤
//! │ body: fixed layout per type, no tags, no field lengths       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Philosophy
//!
//! - Every byte counts, so nothing on the wire describes itself
//! - Writer and reader of a layout sit next to each other
//! - Every layout is covered by a round-trip test

mod bits;
mod codec;
mod packets;

pub use bits::{PlayerState, PLAYER_STATE_SIZE};
pub use codec::{Reader, Writer, VEC3_SIZE};
pub use packets::{Packet, PunchKind};
