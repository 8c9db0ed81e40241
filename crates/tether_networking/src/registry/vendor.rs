//! Vendors: one factory per category of the type enumeration.
//!
//! A vendor recognises simulation objects of its category by name and
//! builds the matching entity. Weapon and hitscan vendors only recognise;
//! those kinds travel as indices inside other messages and never exist as
//! standalone entities.

use crate::entity::{Coin, Enemy, Entity, EntityContext, Item, Player, Projectile};
use crate::simulation::ObjectHandle;
use tether_shared::{EntityCategory, EntityId, EntityType, PeerId};

/// Builds entities for one category.
pub trait Vendor {
    /// Category this vendor serves. Its sub-range of the type enumeration is
    /// [`EntityCategory::range`].
    fn category(&self) -> EntityCategory;

    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Concrete type of an object called `name`, if it belongs here.
    fn identify(&self, name: &str) -> Option<EntityType> {
        EntityType::identify(name, self.category())
    }

    /// Wraps an existing simulation object.
    fn bind(
        &self,
        ty: EntityType,
        id: EntityId,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>>;

    /// Spawns a fresh object for `ty` and wraps it. If the simulation cannot
    /// spawn it the entity is a placeholder.
    fn supply(
        &self,
        ty: EntityType,
        id: EntityId,
        owner: PeerId,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        let handle = ctx.sim.spawn(ty);
        if handle.is_none() {
            tracing::warn!(entity = %id, ?ty, "simulation could not spawn, keeping placeholder");
        }
        let entity = self.bind(ty, id, owner, handle, ctx);
        if entity.is_none() {
            if let Some(handle) = handle {
                ctx.sim.destroy(handle);
            }
        }
        entity
    }
}

/// Human players.
#[derive(Debug, Default)]
pub struct PlayerVendor;

impl Vendor for PlayerVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Player
    }

    fn name(&self) -> &'static str {
        "players"
    }

    fn bind(
        &self,
        _ty: EntityType,
        id: EntityId,
        _owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        if id.peer() == ctx.local {
            return Some(Box::new(Player::local(id)));
        }
        Some(Box::new(Player::remote(id, handle)))
    }

    fn supply(
        &self,
        ty: EntityType,
        id: EntityId,
        owner: PeerId,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        if id.peer() == ctx.local {
            return self.bind(ty, id, owner, None, ctx);
        }
        let handle = ctx.sim.spawn(ty);
        self.bind(ty, id, owner, handle, ctx)
    }
}

/// Enemies and bosses.
#[derive(Debug, Default)]
pub struct EnemyVendor;

impl Vendor for EnemyVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Enemy
    }

    fn name(&self) -> &'static str {
        "enemies"
    }

    fn bind(
        &self,
        ty: EntityType,
        id: EntityId,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        Enemy::new(id, ty, owner, handle, ctx).map(|e| Box::new(e) as Box<dyn Entity>)
    }
}

/// Weapons, recognised but never replicated on their own.
#[derive(Debug, Default)]
pub struct WeaponVendor;

impl Vendor for WeaponVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Weapon
    }

    fn name(&self) -> &'static str {
        "weapons"
    }

    fn bind(
        &self,
        _ty: EntityType,
        _id: EntityId,
        _owner: PeerId,
        _handle: Option<ObjectHandle>,
        _ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        None
    }

    fn supply(
        &self,
        _ty: EntityType,
        _id: EntityId,
        _owner: PeerId,
        _ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        None
    }
}

/// Carriable items.
#[derive(Debug, Default)]
pub struct ItemVendor;

impl Vendor for ItemVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Item
    }

    fn name(&self) -> &'static str {
        "items"
    }

    fn bind(
        &self,
        ty: EntityType,
        id: EntityId,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        Some(Box::new(Item::new(id, ty, owner, handle, ctx)))
    }
}

/// Coins.
#[derive(Debug, Default)]
pub struct CoinVendor;

impl Vendor for CoinVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Coin
    }

    fn name(&self) -> &'static str {
        "coins"
    }

    fn bind(
        &self,
        _ty: EntityType,
        id: EntityId,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        Some(Box::new(Coin::new(id, owner, handle, ctx)))
    }
}

/// Physical projectiles.
#[derive(Debug, Default)]
pub struct ProjectileVendor;

impl Vendor for ProjectileVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Projectile
    }

    fn name(&self) -> &'static str {
        "projectiles"
    }

    fn bind(
        &self,
        ty: EntityType,
        id: EntityId,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        Some(Box::new(Projectile::new(id, ty, owner, handle, ctx)))
    }
}

/// Hitscan beams, recognised but never replicated on their own.
#[derive(Debug, Default)]
pub struct HitscanVendor;

impl Vendor for HitscanVendor {
    fn category(&self) -> EntityCategory {
        EntityCategory::Hitscan
    }

    fn name(&self) -> &'static str {
        "hitscans"
    }

    fn bind(
        &self,
        _ty: EntityType,
        _id: EntityId,
        _owner: PeerId,
        _handle: Option<ObjectHandle>,
        _ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        None
    }

    fn supply(
        &self,
        _ty: EntityType,
        _id: EntityId,
        _owner: PeerId,
        _ctx: &mut EntityContext<'_>,
    ) -> Option<Box<dyn Entity>> {
        None
    }
}

/// One vendor for every category.
#[must_use]
pub fn default_vendors() -> Vec<Box<dyn Vendor>> {
    vec![
        Box::new(PlayerVendor),
        Box::new(EnemyVendor),
        Box::new(WeaponVendor),
        Box::new(ItemVendor),
        Box::new(CoinVendor),
        Box::new(ProjectileVendor),
        Box::new(HitscanVendor),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::ctx;
    use crate::simulation::MockSimulation;

    #[test]
    fn test_default_vendors_cover_every_category_once() {
        let vendors = default_vendors();
        for ty in EntityType::ALL {
            let serving = vendors.iter().filter(|v| v.category() == ty.category()).count();
            assert_eq!(serving, 1, "{ty:?}");
        }
    }

    #[test]
    fn test_identify_by_clone_name() {
        assert_eq!(ItemVendor.identify("Torch (Clone)"), Some(EntityType::Torch));
        assert_eq!(ItemVendor.identify("Rocket (Clone)"), None);
        assert_eq!(WeaponVendor.identify("Railcannon"), Some(EntityType::Railcannon));
    }

    #[test]
    fn test_index_only_vendors_supply_nothing() {
        let mut sim = MockSimulation::new();
        let mut c = ctx(1, 0.0, &mut sim);
        assert!(WeaponVendor
            .supply(EntityType::Shotgun, EntityId(5), PeerId(1), &mut c)
            .is_none());
        assert!(HitscanVendor
            .supply(EntityType::RevolverBeam, EntityId(5), PeerId(1), &mut c)
            .is_none());
        assert_eq!(sim.object_count(), 0);
    }

    #[test]
    fn test_local_player_gets_no_doll() {
        let mut sim = MockSimulation::new();
        let mut c = ctx(7, 0.0, &mut sim);
        let local = PlayerVendor
            .supply(EntityType::Player, EntityId(7), PeerId(7), &mut c)
            .unwrap();
        assert!(local.is_live());
        let remote = PlayerVendor
            .supply(EntityType::Player, EntityId(8), PeerId(8), &mut c)
            .unwrap();
        assert!(remote.core().handle.is_some());
        assert_eq!(sim.object_count(), 1);
    }
}
