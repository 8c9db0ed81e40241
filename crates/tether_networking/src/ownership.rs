//! # Ownership
//!
//! Every ownable entity has exactly one owner from the moment it exists.
//! Authority moves in two ways:
//!
//! - **Take**: local gameplay touched the object (pickup, parry, hook). This
//!   is unconditional and starts the lock window.
//! - **Request**: a snapshot claims another owner. It is honoured only once
//!   the lock window since the last transfer has passed.
//!
//! ```text
//!   Owned(A) ──take(B)──> Owned(B) ──request(A) while locked──> Owned(B)
//!                            │
//!                            └──request(A) after window────> Owned(A)
//! ```
//!
//! The transfer hook runs before the call returns, so kinematic flags are
//! right before anything reads or writes the transform again.

use crate::entity::{Entity, EntityContext};
use tether_shared::PeerId;

/// Owner of an entity plus the cooldown since the last transfer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ownership {
    owner: PeerId,
    last_transfer: f64,
    lock_window: f32,
}

impl Ownership {
    /// Owned by `owner`, unlocked.
    #[must_use]
    pub const fn new(owner: PeerId, lock_window: f32) -> Self {
        Self {
            owner,
            last_transfer: f64::NEG_INFINITY,
            lock_window,
        }
    }

    /// Current owner.
    #[inline]
    #[must_use]
    pub const fn owner(&self) -> PeerId {
        self.owner
    }

    /// Session time of the last transfer.
    #[inline]
    #[must_use]
    pub const fn last_transfer(&self) -> f64 {
        self.last_transfer
    }

    /// Whether snapshot requests are ignored at `now`.
    #[inline]
    #[must_use]
    pub fn locked(&self, now: f64) -> bool {
        now - self.last_transfer < f64::from(self.lock_window)
    }

    /// Local take. Always succeeds and restarts the window. Returns whether
    /// the owner changed.
    pub fn take(&mut self, peer: PeerId, now: f64) -> bool {
        let changed = self.owner != peer;
        self.owner = peer;
        self.last_transfer = now;
        changed
    }

    /// Snapshot claim. Returns whether the owner changed.
    pub fn request(&mut self, claimed: PeerId, now: f64) -> bool {
        if claimed == self.owner || self.locked(now) {
            return false;
        }
        self.owner = claimed;
        self.last_transfer = now;
        true
    }

    /// Host adoption of a departed peer's entities. Ignores the lock.
    pub fn force(&mut self, peer: PeerId, now: f64) -> bool {
        self.take(peer, now)
    }
}

/// An entity whose authority can move between peers.
pub trait OwnableEntity: Entity {
    /// Ownership state.
    fn ownership(&self) -> &Ownership;

    /// Ownership state, mutable.
    fn ownership_mut(&mut self) -> &mut Ownership;

    /// Runs after every owner change, before anything else touches the
    /// entity.
    fn on_transfer(&mut self, ctx: &mut EntityContext<'_>);

    /// Current owner.
    fn owner(&self) -> PeerId {
        self.ownership().owner()
    }

    /// Claims the entity for this machine.
    fn take_ownage(&mut self, ctx: &mut EntityContext<'_>) {
        if self.ownership_mut().take(ctx.local, ctx.now) {
            tracing::debug!(entity = %self.id(), "took ownership");
            self.on_transfer(ctx);
        }
    }

    /// Applies the owner a snapshot claims. Returns whether it changed.
    fn sync_owner(&mut self, claimed: PeerId, ctx: &mut EntityContext<'_>) -> bool {
        let changed = self.ownership_mut().request(claimed, ctx.now);
        if changed {
            tracing::debug!(entity = %self.id(), owner = %claimed, "ownership moved");
            self.on_transfer(ctx);
        }
        changed
    }

    /// Hands the entity to `peer` regardless of the lock window.
    fn force_owner(&mut self, peer: PeerId, ctx: &mut EntityContext<'_>) {
        if self.ownership_mut().force(peer, ctx.now) {
            self.on_transfer(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: PeerId = PeerId(10);
    const B: PeerId = PeerId(20);

    #[test]
    fn test_new_is_unlocked() {
        let o = Ownership::new(A, 1.0);
        assert_eq!(o.owner(), A);
        assert!(!o.locked(0.0));
    }

    #[test]
    fn test_take_starts_lock_window() {
        let mut o = Ownership::new(A, 1.0);
        assert!(o.take(B, 5.0));
        assert!(o.locked(5.0));
        assert!(o.locked(5.99));
        assert!(!o.locked(6.0));
    }

    #[test]
    fn test_request_ignored_while_locked() {
        let mut o = Ownership::new(A, 1.0);
        o.take(B, 5.0);
        assert!(!o.request(A, 5.5));
        assert_eq!(o.owner(), B);

        assert!(o.request(A, 6.5));
        assert_eq!(o.owner(), A);
        assert!(o.locked(6.5));
    }

    #[test]
    fn test_request_for_current_owner_is_noop() {
        let mut o = Ownership::new(A, 1.0);
        assert!(!o.request(A, 100.0));
        assert!(!o.locked(100.0));
    }

    #[test]
    fn test_retake_refreshes_window() {
        let mut o = Ownership::new(A, 1.0);
        assert!(!o.take(A, 3.0));
        assert!(o.locked(3.5));
    }

    #[test]
    fn test_force_ignores_lock() {
        let mut o = Ownership::new(A, 1.0);
        o.take(B, 1.0);
        assert!(o.force(A, 1.1));
        assert_eq!(o.owner(), A);
    }
}
