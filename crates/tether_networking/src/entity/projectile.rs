//! Physical projectiles: rockets, cannonballs, grenades.
//!
//! These are the objects authority moves for most often. A parry or a
//! rocket ride hands the projectile to whoever touched it.

use super::{
    notice_destroyed, projectile_flags, Body, Damage, Entity, EntityContext, EntityCore,
    EntityPayload, ProjectilePayload,
};
use crate::ownership::{OwnableEntity, Ownership};
use crate::simulation::ObjectHandle;
use tether_shared::{EntityId, EntityType, PeerId, Vec3};

/// A projectile in flight.
#[derive(Clone, Debug)]
pub struct Projectile {
    core: EntityCore,
    body: Body,
    flags: u8,
    rider: Option<PeerId>,
}

impl Projectile {
    /// Projectile of kind `ty` owned by `owner`.
    #[must_use]
    pub fn new(
        id: EntityId,
        ty: EntityType,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Self {
        let position = handle.and_then(|h| ctx.sim.position(h)).unwrap_or(Vec3::ZERO);
        let direction = handle.and_then(|h| ctx.sim.velocity(h)).unwrap_or(Vec3::ZERO);
        let projectile = Self {
            core: EntityCore::new(id, ty, handle),
            body: Body::new(owner, position, direction, ctx.lock_window),
            flags: 0,
            rider: None,
        };
        projectile.body.on_transfer(handle, ctx);
        projectile
    }

    /// Player riding the projectile.
    #[must_use]
    pub const fn rider(&self) -> Option<PeerId> {
        self.rider
    }

    /// The local player parried the projectile: it turns around, charged,
    /// and now belongs to the parrier.
    pub fn parry(&mut self, ctx: &mut EntityContext<'_>) {
        self.take_ownage(ctx);
        self.flags |= projectile_flags::CHARGED;
        if let Some(h) = self.core.handle {
            if let Some(velocity) = ctx.sim.velocity(h) {
                ctx.sim.set_velocity(h, velocity * -1.0);
            }
        }
    }

    /// Stops the projectile mid-air.
    pub fn freeze(&mut self) {
        self.flags |= projectile_flags::FROZEN;
    }

    /// The local player climbs on.
    pub fn ride(&mut self, ctx: &mut EntityContext<'_>) {
        self.take_ownage(ctx);
        self.rider = Some(ctx.local);
    }

    /// The rider jumps off.
    pub fn dismount(&mut self) {
        self.rider = None;
    }

    fn report_direction(&self, ctx: &EntityContext<'_>) -> Vec3 {
        match self.core.handle {
            Some(h) if self.body.is_mine(ctx) => ctx
                .sim
                .velocity(h)
                .unwrap_or(self.body.rotation.target()),
            _ => self.body.rotation.target(),
        }
    }
}

impl Entity for Projectile {
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
        EntityPayload::Projectile(ProjectilePayload {
            owner: self.body.ownership.owner(),
            position: self.body.report_position(self.core.handle, ctx),
            direction: self.report_direction(ctx),
            flags: self.flags,
            rider: self.rider,
        })
    }

    fn apply(&mut self, payload: &EntityPayload, ctx: &mut EntityContext<'_>) {
        let EntityPayload::Projectile(p) = payload else {
            tracing::warn!(entity = %self.core.id, "projectile received a foreign payload");
            return;
        };
        self.sync_owner(p.owner, ctx);
        if self.body.is_mine(ctx) {
            return;
        }
        self.flags = p.flags;
        self.rider = p.rider;
        self.body.position.push(p.position, ctx.now, ctx.spacing);
        self.body.rotation.snap(p.direction, ctx.now);
        self.core.last_update = ctx.now;
    }

    fn update(&mut self, ctx: &mut EntityContext<'_>) {
        notice_destroyed(&mut self.core, ctx);
        if self.core.dead || self.body.is_mine(ctx) {
            return;
        }
        if let Some(h) = self.core.handle {
            ctx.sim
                .set_position(h, self.body.position.sample(ctx.now, ctx.spacing));
            ctx.sim.set_velocity(h, self.body.rotation.target());
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

impl OwnableEntity for Projectile {
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
    use crate::entity::test_support::ctx;
    use crate::simulation::{MockSimulation, Simulation};

    #[test]
    fn test_parry_reverses_and_claims() {
        let mut sim = MockSimulation::new();
        let h = sim.spawn(EntityType::Rocket).unwrap();
        sim.set_velocity(h, Vec3::new(0.0, 0.0, 30.0));

        let mut c = ctx(2, 5.0, &mut sim);
        let mut rocket = Projectile::new(EntityId(50), EntityType::Rocket, PeerId(1), Some(h), &mut c);
        rocket.parry(&mut c);

        assert_eq!(rocket.owner(), PeerId(2));
        let EntityPayload::Projectile(p) = rocket.snapshot(&c) else {
            panic!("wrong payload");
        };
        assert_eq!(p.direction, Vec3::new(0.0, 0.0, -30.0));
        assert_eq!(p.flags & projectile_flags::CHARGED, projectile_flags::CHARGED);
        assert!(!sim.is_kinematic(h));
    }

    #[test]
    fn test_stale_claim_inside_window_is_ignored() {
        let mut sim = MockSimulation::new();
        let mut c = ctx(2, 5.0, &mut sim);
        let mut rocket = Projectile::new(EntityId(50), EntityType::Rocket, PeerId(1), None, &mut c);
        rocket.ride(&mut c);

        c.now = 5.5;
        let stale = EntityPayload::Projectile(ProjectilePayload {
            owner: PeerId(1),
            position: Vec3::ZERO,
            direction: Vec3::Y,
            flags: 0,
            rider: None,
        });
        rocket.apply(&stale, &mut c);
        assert_eq!(rocket.owner(), PeerId(2));
        assert_eq!(rocket.rider(), Some(PeerId(2)));
    }
}
