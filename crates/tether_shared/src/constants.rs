//! # Protocol Constants
//!
//! Defaults baked into every peer. The runtime values live in the session
//! configuration; these are what an empty config file resolves to.

/// Snapshot ticks per second.
pub const DEFAULT_TICK_RATE: u32 = 30;

/// Seconds after an ownership transfer during which snapshot claims are ignored.
pub const LOCK_WINDOW_SECS: f32 = 1.0;

/// Wire protocol version `(major, minor, patch)`. Peers must match exactly.
pub const PROTOCOL_VERSION: (u8, u8, u8) = (1, 2, 0);

/// Bytes reserved per tick for outgoing messages.
pub const DEFAULT_ARENA_CAPACITY: usize = 256 * 1024;

/// Upper bound of one directive (non-snapshot) message.
pub const MAX_DIRECTIVE_SIZE: usize = 1200;

/// Sentinel for an absent weapon or emote in the player state.
pub const ABSENT: u8 = 0xFF;

/// Maximum number of peers in one session, host included.
pub const MAX_PEERS: usize = 8;
