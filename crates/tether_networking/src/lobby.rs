//! # Lobby
//!
//! Who is in the session, in join order. Membership itself comes from the
//! external lobby service; this is the replication core's copy of it.

use tether_shared::PeerId;

/// Connected peers, host first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lobby {
    host: PeerId,
    members: Vec<PeerId>,
}

impl Lobby {
    /// A lobby holding only `host`.
    #[must_use]
    pub fn new(host: PeerId) -> Self {
        Self {
            host,
            members: vec![host],
        }
    }

    /// The host.
    #[inline]
    #[must_use]
    pub const fn host(&self) -> PeerId {
        self.host
    }

    /// Adds a peer. Returns `false` if it was already present.
    pub fn join(&mut self, peer: PeerId) -> bool {
        if self.contains(peer) {
            return false;
        }
        self.members.push(peer);
        true
    }

    /// Removes a peer. The host cannot leave its own lobby.
    pub fn leave(&mut self, peer: PeerId) -> bool {
        if peer == self.host {
            return false;
        }
        let before = self.members.len();
        self.members.retain(|p| *p != peer);
        self.members.len() != before
    }

    /// Whether `peer` is connected.
    #[must_use]
    pub fn contains(&self, peer: PeerId) -> bool {
        self.members.contains(&peer)
    }

    /// Every peer, host first, then in join order.
    pub fn peers(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.members.iter().copied()
    }

    /// Every peer except `peer`.
    pub fn others(&self, peer: PeerId) -> impl Iterator<Item = PeerId> + '_ {
        self.peers().filter(move |p| *p != peer)
    }

    /// Position of `peer` in join order. The host is slot 0.
    #[must_use]
    pub fn slot_of(&self, peer: PeerId) -> Option<usize> {
        self.members.iter().position(|p| *p == peer)
    }

    /// Number of connected peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Never true, the host is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
