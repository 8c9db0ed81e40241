//! Enemies, bosses included.
//!
//! One struct covers every enemy kind. What differs between kinds lives in
//! the [`EnemyDescriptor`] table rather than in per-kind types.

use super::{
    notice_destroyed, Body, Damage, EnemyPayload, Entity, EntityContext, EntityCore, EntityPayload,
};
use crate::ownership::{OwnableEntity, Ownership};
use crate::simulation::ObjectHandle;
use tether_shared::{EntityCategory, EntityId, EntityType, PeerId, Vec3};

/// Static facts about one enemy kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyDescriptor {
    /// Kind described.
    pub ty: EntityType,
    /// Health at spawn.
    pub max_health: f32,
    /// Shows a boss bar and is host-only to create.
    pub boss: bool,
}

const fn describe(ty: EntityType, max_health: f32) -> EnemyDescriptor {
    EnemyDescriptor {
        ty,
        max_health,
        boss: ty.is_boss(),
    }
}

static DESCRIPTORS: [EnemyDescriptor; 12] = [
    describe(EntityType::Husk, 3.0),
    describe(EntityType::Ranger, 4.0),
    describe(EntityType::Brute, 25.0),
    describe(EntityType::Drone, 1.0),
    describe(EntityType::Sentry, 10.0),
    describe(EntityType::Flamer, 8.0),
    describe(EntityType::Bladesman, 15.0),
    describe(EntityType::Mindflayer, 20.0),
    describe(EntityType::Idol, 10.0),
    describe(EntityType::Colossus, 120.0),
    describe(EntityType::Seraph, 80.0),
    describe(EntityType::Leviathan, 150.0),
];

impl EnemyDescriptor {
    /// Descriptor for `ty`, if it is an enemy.
    #[must_use]
    pub fn of(ty: EntityType) -> Option<&'static Self> {
        if ty.category() != EntityCategory::Enemy {
            return None;
        }
        DESCRIPTORS.iter().find(|d| d.ty == ty)
    }
}

/// An enemy driven by its owner's AI.
#[derive(Clone, Debug)]
pub struct Enemy {
    core: EntityCore,
    body: Body,
    descriptor: EnemyDescriptor,
    health: f32,
    flags: u8,
}

impl Enemy {
    /// Enemy of kind `ty` owned by `owner`. Returns `None` for other kinds.
    #[must_use]
    pub fn new(
        id: EntityId,
        ty: EntityType,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Self> {
        let descriptor = *EnemyDescriptor::of(ty)?;
        let position = handle
            .and_then(|h| ctx.sim.position(h))
            .unwrap_or(Vec3::ZERO);
        if let Some(h) = handle {
            ctx.sim.set_health(h, descriptor.max_health);
        }
        let enemy = Self {
            core: EntityCore::new(id, ty, handle),
            body: Body::new(owner, position, Vec3::ZERO, ctx.lock_window),
            descriptor,
            health: descriptor.max_health,
            flags: 0,
        };
        enemy.body.on_transfer(handle, ctx);
        Some(enemy)
    }

    /// Static facts about this kind.
    #[must_use]
    pub const fn descriptor(&self) -> &EnemyDescriptor {
        &self.descriptor
    }

    /// Last known health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Replaces the reported [`super::enemy_flags`]. Only the owner's
    /// flags travel; everyone else mirrors them.
    pub fn set_flags(&mut self, flags: u8) {
        self.flags = flags & super::enemy_flags::ALL;
    }
}

impl Entity for Enemy {
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
        let health = match handle {
            Some(h) if self.body.is_mine(ctx) => ctx.sim.health(h).unwrap_or(self.health),
            _ => self.health,
        };
        let mut flags = self.flags;
        if self.descriptor.boss {
            flags |= super::enemy_flags::BOSS_BAR;
        }
        EntityPayload::Enemy(EnemyPayload {
            owner: self.body.ownership.owner(),
            health,
            position: self.body.report_position(handle, ctx),
            yaw: self.body.report_rotation(handle, ctx).y,
            flags,
        })
    }

    fn apply(&mut self, payload: &EntityPayload, ctx: &mut EntityContext<'_>) {
        let EntityPayload::Enemy(p) = payload else {
            tracing::warn!(entity = %self.core.id, "enemy received a foreign payload");
            return;
        };
        self.sync_owner(p.owner, ctx);
        if self.body.is_mine(ctx) {
            return;
        }
        self.health = p.health;
        self.flags = p.flags;
        self.body
            .push(p.position, Vec3::new(0.0, p.yaw, 0.0), ctx);
        if let Some(h) = self.core.handle {
            ctx.sim.set_health(h, p.health);
        }
        self.core.last_update = ctx.now;
    }

    fn update(&mut self, ctx: &mut EntityContext<'_>) {
        notice_destroyed(&mut self.core, ctx);
        if self.core.dead {
            return;
        }
        if self.body.is_mine(ctx) {
            if let Some(health) = self.core.handle.and_then(|h| ctx.sim.health(h)) {
                self.health = health;
                if health <= 0.0 {
                    self.kill(ctx);
                }
            }
            return;
        }
        self.body.drive(self.core.handle, ctx);
    }

    fn damage(&mut self, damage: &Damage, ctx: &mut EntityContext<'_>) {
        if !self.body.is_mine(ctx) || self.core.dead {
            return;
        }
        let current = self
            .core
            .handle
            .and_then(|h| ctx.sim.health(h))
            .unwrap_or(self.health);
        let health = (current - damage.amount).max(0.0);
        self.health = health;
        if let Some(h) = self.core.handle {
            ctx.sim.set_health(h, health);
        }
        if health <= 0.0 {
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

impl OwnableEntity for Enemy {
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
