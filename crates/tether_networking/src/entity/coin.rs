//! Thrown coins.
//!
//! The thrower's team is fixed when the coin is created. Later snapshots
//! cannot change it, so a coin that changes hands mid-air still hurts the
//! right players.

use super::{
    coin_flags, notice_destroyed, Body, CoinPayload, Damage, Entity, EntityContext, EntityCore, EntityPayload,
};
use crate::ownership::{OwnableEntity, Ownership};
use crate::simulation::ObjectHandle;
use tether_shared::{EntityId, EntityType, PeerId, Vec3};

/// A coin in flight.
#[derive(Clone, Debug)]
pub struct Coin {
    core: EntityCore,
    body: Body,
    velocity: Vec3,
    team: Option<u8>,
    flags: u8,
    power: Option<u8>,
}

impl Coin {
    /// Coin owned by `owner`. The team is learned from the first snapshot
    /// unless [`Coin::set_team`] fixes it first.
    #[must_use]
    pub fn new(id: EntityId, owner: PeerId, handle: Option<ObjectHandle>, ctx: &mut EntityContext<'_>) -> Self {
        let position = handle.and_then(|h| ctx.sim.position(h)).unwrap_or(Vec3::ZERO);
        let coin = Self {
            core: EntityCore::new(id, EntityType::Coin, handle),
            body: Body::new(owner, position, Vec3::ZERO, ctx.lock_window),
            velocity: Vec3::ZERO,
            team: None,
            flags: 0,
            power: None,
        };
        coin.body.on_transfer(handle, ctx);
        coin
    }

    /// Fixes the thrower's team. Ignored once set.
    pub fn set_team(&mut self, team: u8) {
        self.team.get_or_insert(team);
    }

    /// Thrower's team.
    #[must_use]
    pub fn team(&self) -> u8 {
        self.team.unwrap_or(0)
    }

    /// A ricochet split the coin in two.
    pub fn split(&mut self) {
        self.flags |= coin_flags::SPLIT;
    }

    /// The coin was shot; it ricochets with `power`.
    pub fn shoot(&mut self, power: u8, ctx: &mut EntityContext<'_>) {
        self.take_ownage(ctx);
        self.power = Some(power);
    }
}

impl Entity for Coin {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn authority(&self) -> PeerId {
        self.body.ownership.owner()
    }

    fn snapshot(&self, ctx: &EntityContext<'_>) -> EntityPayload {
        let handle = self.core.handle;
        let velocity = match handle {
            Some(h) if self.body.is_mine(ctx) => ctx.sim.velocity(h).unwrap_or(self.velocity),
            _ => self.velocity,
        };
        EntityPayload::Coin(CoinPayload {
            owner: self.body.ownership.owner(),
            position: self.body.report_position(handle, ctx),
            velocity,
            team: self.team(),
            flags: self.flags,
            power: self.power,
        })
    }

    fn apply(&mut self, payload: &EntityPayload, ctx: &mut EntityContext<'_>) {
        let EntityPayload::Coin(p) = payload else {
            tracing::warn!(entity = %self.core.id, "coin received a foreign payload");
            return;
        };
        self.set_team(p.team);
        self.sync_owner(p.owner, ctx);
        if self.body.is_mine(ctx) {
            return;
        }
        self.velocity = p.velocity;
        self.flags = p.flags;
        self.power = p.power;
        self.body.push(p.position, Vec3::ZERO, ctx);
        self.core.last_update = ctx.now;
    }

    fn update(&mut self, ctx: &mut EntityContext<'_>) {
        notice_destroyed(&mut self.core, ctx);
        if self.core.dead {
            return;
        }
        self.body.drive(self.core.handle, ctx);
        if let Some(h) = self.core.handle {
            if !self.body.is_mine(ctx) {
                ctx.sim.set_velocity(h, self.velocity);
            }
        }
    }

    fn damage(&mut self, damage: &Damage, ctx: &mut EntityContext<'_>) {
        if self.body.is_mine(ctx) && damage.amount > 0.0 {
            self.kill(ctx);
        }
    }

    fn as_ownable(&self) -> Option<&dyn OwnableEntity> {
        Some(self)
    }

    fn as_ownable_mut(&mut self) -> Option<&mut dyn OwnableEntity> {
        Some(self)
    }
}

impl OwnableEntity for Coin {
    fn ownership(&self) -> &Ownership {
        &self.body.ownership
    }

    fn ownership_mut(&mut self) -> &mut Ownership {
        &mut self.body.ownership
    }

    fn on_transfer(&mut self, ctx: &mut EntityContext<'_>) {
        self.body.on_transfer(self.core.handle, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::coin_flags;
    use crate::entity::test_support::ctx;
    use crate::simulation::MockSimulation;

    fn payload(owner: u64, team: u8) -> EntityPayload {
        EntityPayload::Coin(CoinPayload {
            owner: PeerId(owner),
            position: Vec3::new(1.0, 1.0, 1.0),
            velocity: Vec3::Y,
            team,
            flags: coin_flags::SPLIT,
            power: Some(3),
        })
    }

    #[test]
    fn test_team_is_fixed_at_creation() {
        let mut sim = MockSimulation::new();
        let mut c = ctx(5, 0.0, &mut sim);
        let mut coin = Coin::new(EntityId(40), PeerId(1), None, &mut c);

        coin.apply(&payload(1, 2), &mut c);
        coin.apply(&payload(1, 6), &mut c);
        assert_eq!(coin.team(), 2);
    }

    #[test]
    fn test_non_owner_reports_remote_state() {
        let mut sim = MockSimulation::new();
        let mut c = ctx(5, 0.0, &mut sim);
        let mut coin = Coin::new(EntityId(40), PeerId(1), None, &mut c);
        coin.apply(&payload(1, 2), &mut c);
        assert_eq!(coin.snapshot(&c), payload(1, 2));
    }

    #[test]
    fn test_shoot_claims_coin() {
        let mut sim = MockSimulation::new();
        let mut c = ctx(5, 3.0, &mut sim);
        let mut coin = Coin::new(EntityId(40), PeerId(1), None, &mut c);
        coin.shoot(7, &mut c);
        assert_eq!(coin.owner(), PeerId(5));

        let EntityPayload::Coin(p) = coin.snapshot(&c) else {
            panic!("wrong payload");
        };
        assert_eq!(p.power, Some(7));
    }
}
