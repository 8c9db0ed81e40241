//! # Administration
//!
//! The host's hook for abuse control. The server endpoint reports traffic,
//! violations and entity creations; the administrator answers with a
//! [`Verdict`]. Rate limiting and ban bookkeeping live behind this trait so
//! the endpoint never decides how strict to be.

use std::collections::HashSet;
use tether_shared::{EntityId, EntityType, PacketType, PeerId};

/// What the server should do about a peer's message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Process normally.
    Allow,
    /// Drop this message.
    Drop,
    /// Drop this message; the peer has been warned.
    Warn,
    /// Drop this message and remove the peer for good.
    Ban,
}

impl Verdict {
    /// Whether the message may be processed.
    #[inline]
    #[must_use]
    pub const fn allows(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// The stricter of two verdicts.
    #[must_use]
    pub const fn max(self, other: Self) -> Self {
        if (other as u8) > (self as u8) {
            other
        } else {
            self
        }
    }
}

/// A rule a peer broke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Violation {
    /// The message could not be decoded.
    Malformed(PacketType),
    /// A message claimed to come from someone else.
    Impersonation {
        /// Who the message claimed to be.
        claimed: PeerId,
    },
    /// A snapshot tried to create a kind the peer may not create.
    ForbiddenSpawn(EntityType),
    /// A client sent a packet only the host may send.
    HostOnly(PacketType),
    /// A kill for an entity the peer has no authority over.
    NotAuthority(EntityId),
}

/// Abuse control consulted by the host.
pub trait Administration {
    /// Whether `peer` may not join.
    fn is_banned(&self, peer: PeerId) -> bool;

    /// Every received message, before it is decoded.
    fn on_traffic(&mut self, peer: PeerId, kind: PacketType, bytes: usize, now: f64) -> Verdict;

    /// A rule was broken.
    fn on_violation(&mut self, peer: PeerId, violation: Violation, now: f64) -> Verdict;

    /// A snapshot from `peer` is about to create an entity of kind `ty`.
    fn on_entity_created(&mut self, peer: PeerId, ty: EntityType, now: f64) -> Verdict;

    /// `peer` left or was removed.
    fn on_leave(&mut self, peer: PeerId);

    /// Bans `peer` outright.
    fn ban(&mut self, peer: PeerId);
}

/// Allows everything except peers banned by hand.
#[derive(Debug, Default)]
pub struct PermissiveAdministration {
    banned: HashSet<PeerId>,
}

impl PermissiveAdministration {
    /// Empty ban list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Administration for PermissiveAdministration {
    fn is_banned(&self, peer: PeerId) -> bool {
        self.banned.contains(&peer)
    }

    fn on_traffic(&mut self, peer: PeerId, _kind: PacketType, _bytes: usize, _now: f64) -> Verdict {
        if self.is_banned(peer) {
            Verdict::Drop
        } else {
            Verdict::Allow
        }
    }

    fn on_violation(&mut self, _peer: PeerId, _violation: Violation, _now: f64) -> Verdict {
        Verdict::Drop
    }

    fn on_entity_created(&mut self, _peer: PeerId, _ty: EntityType, _now: f64) -> Verdict {
        Verdict::Allow
    }

    fn on_leave(&mut self, _peer: PeerId) {}

    fn ban(&mut self, peer: PeerId) {
        self.banned.insert(peer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_max() {
        assert_eq!(Verdict::Allow.max(Verdict::Warn), Verdict::Warn);
        assert_eq!(Verdict::Ban.max(Verdict::Drop), Verdict::Ban);
        assert!(Verdict::Allow.allows());
        assert!(!Verdict::Warn.allows());
    }

    #[test]
    fn test_permissive_only_blocks_manual_bans() {
        let mut admin = PermissiveAdministration::new();
        let peer = PeerId(4);
        assert_eq!(admin.on_traffic(peer, PacketType::Snapshot, 10_000, 0.0), Verdict::Allow);
        assert_eq!(
            admin.on_violation(peer, Violation::HostOnly(PacketType::Kick), 0.0),
            Verdict::Drop
        );

        admin.ban(peer);
        assert!(admin.is_banned(peer));
        assert_eq!(admin.on_traffic(peer, PacketType::Snapshot, 1, 0.0), Verdict::Drop);
    }
}
