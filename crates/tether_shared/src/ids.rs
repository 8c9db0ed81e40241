//! Identifiers.
//!
//! A peer's stable account identifier doubles as its connection key and as
//! the id of its player entity, so the two newtypes convert into each other.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable account identifier of a peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Placeholder for "no peer".
    pub const NONE: Self = Self(0);

    /// The player entity controlled by this peer.
    #[inline]
    #[must_use]
    pub const fn entity(self) -> EntityId {
        EntityId(self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Identifier of a replicated entity, unique among live entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Interprets a player entity id as the peer controlling it.
    #[inline]
    #[must_use]
    pub const fn peer(self) -> PeerId {
        PeerId(self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}
