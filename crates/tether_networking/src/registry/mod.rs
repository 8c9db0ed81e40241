//! # Entity Registry
//!
//! The session's table of live entities, keyed by id.
//!
//! ## Lifecycle
//!
//! ```text
//!  first sight of an id ──get()──> vendor.supply() ──> live
//!  native object       ──observe()──> vendor.identify() + bind() ──> live
//!  live ──kill()/object gone──> dead ──sweep()──> tombstone
//!  live ──destroy()──> tombstone
//! ```
//!
//! Tombstones remember the type of every removed id. An id is never handed
//! out again, and a late snapshot for a tombstoned id is ignored instead of
//! resurrecting it. The only exception is a player coming back under its
//! own peer id.

mod vendor;

pub use vendor::{
    default_vendors, CoinVendor, EnemyVendor, HitscanVendor, ItemVendor, PlayerVendor,
    ProjectileVendor, Vendor, WeaponVendor,
};

use crate::entity::{Entity, EntityContext};
use crate::lobby::Lobby;
use crate::simulation::ObjectHandle;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tether_shared::{EntityCategory, EntityId, EntityType, PeerId};

/// Table of every entity this peer knows about.
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, Box<dyn Entity>>,
    tombstones: HashMap<EntityId, EntityType>,
    vendors: Vec<Box<dyn Vendor>>,
    next: u64,
}

impl EntityRegistry {
    /// Empty registry with the default vendors. Fresh ids start at `first_id`.
    #[must_use]
    pub fn new(first_id: u64) -> Self {
        Self::with_vendors(first_id, default_vendors())
    }

    /// Empty registry with a custom vendor list.
    #[must_use]
    pub fn with_vendors(first_id: u64, vendors: Vec<Box<dyn Vendor>>) -> Self {
        Self {
            entities: BTreeMap::new(),
            tombstones: HashMap::new(),
            vendors,
            next: first_id.max(1),
        }
    }

    /// Issues a fresh id. Connected players' ids, live ids and tombstoned
    /// ids are skipped; the lobby is consulted on every call.
    pub fn next_id(&mut self, lobby: &Lobby) -> EntityId {
        loop {
            let id = EntityId(self.next);
            self.next = self.next.wrapping_add(1).max(1);
            if lobby.contains(id.peer())
                || self.entities.contains_key(&id)
                || self.tombstones.contains_key(&id)
            {
                continue;
            }
            return id;
        }
    }

    /// Number of entries, dead ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Whether `id` is in the table.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Whether `id` was removed.
    #[must_use]
    pub fn is_tombstoned(&self, id: EntityId) -> bool {
        self.tombstones.contains_key(&id)
    }

    /// Whether `id` is, or was, held by something other than a player. Such
    /// an id can never become a peer's player.
    #[must_use]
    pub fn holds_object(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .map(|e| e.ty())
            .or_else(|| self.tombstones.get(&id).copied())
            .is_some_and(|ty| ty != EntityType::Player)
    }

    /// Existing entry.
    #[must_use]
    pub fn find(&self, id: EntityId) -> Option<&(dyn Entity + 'static)> {
        self.entities.get(&id).map(|e| &**e)
    }

    /// Existing entry, mutable.
    pub fn find_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        self.entities.get_mut(&id).map(|e| &mut **e)
    }

    /// Looks up `id`, creating it through the vendor for `ty` on first
    /// sight. Returns `None` if the id belongs to another type, was
    /// tombstoned, or no vendor can build `ty`.
    pub fn get(
        &mut self,
        id: EntityId,
        ty: EntityType,
        owner: PeerId,
        ctx: &mut EntityContext<'_>,
    ) -> Option<&mut (dyn Entity + 'static)> {
        if let Some(existing) = self.entities.get(&id).map(|e| e.ty()) {
            if existing != ty {
                tracing::warn!(entity = %id, ?existing, claimed = ?ty, "type mismatch, ignoring");
                return None;
            }
            return self.find_mut(id);
        }
        if let Some(&dead) = self.tombstones.get(&id) {
            if !(dead == ty && ty == EntityType::Player) {
                tracing::trace!(entity = %id, "stale update for removed entity");
                return None;
            }
            self.tombstones.remove(&id);
        }

        let Some(vendor) = self.vendors.iter().find(|v| v.category() == ty.category()) else {
            tracing::error!(?ty, "no vendor registered for type");
            return None;
        };
        let entity = vendor.supply(ty, id, owner, ctx)?;
        tracing::debug!(entity = %id, ?ty, %owner, vendor = vendor.name(), "entity created");
        let slot = self.entities.entry(id).or_insert(entity);
        Some(&mut **slot)
    }

    /// Adds an entity. If the id is already taken the existing entry wins and
    /// `false` is returned.
    pub fn insert(&mut self, entity: Box<dyn Entity>) -> bool {
        match self.entities.entry(entity.id()) {
            Entry::Occupied(_) => {
                tracing::debug!(entity = %entity.id(), "duplicate create, keeping first");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(entity);
                true
            }
        }
    }

    /// Registers an object the simulation spawned on its own. The vendors
    /// are asked in turn to identify it by name.
    pub fn observe(
        &mut self,
        handle: ObjectHandle,
        lobby: &Lobby,
        ctx: &mut EntityContext<'_>,
    ) -> Option<EntityId> {
        let name = ctx.sim.object_name(handle)?.to_owned();
        let Some(ty) = self.vendors.iter().find_map(|v| v.identify(&name)) else {
            tracing::trace!(%name, "object is not replicated");
            return None;
        };
        self.observe_as(handle, ty, lobby, ctx)
    }

    /// Registers a native object whose type is already known.
    pub fn observe_as(
        &mut self,
        handle: ObjectHandle,
        ty: EntityType,
        lobby: &Lobby,
        ctx: &mut EntityContext<'_>,
    ) -> Option<EntityId> {
        if !ty.category().is_replicated() {
            return None;
        }
        let index = self.vendors.iter().position(|v| v.category() == ty.category());
        let Some(index) = index else {
            tracing::error!(?ty, "no vendor registered for type");
            return None;
        };
        let id = self.next_id(lobby);
        let entity = self.vendors[index].bind(ty, id, ctx.local, Some(handle), ctx)?;
        tracing::debug!(entity = %id, ?ty, "observed native object");
        self.insert(entity).then_some(id)
    }

    /// Kills `id`. `remote` marks a death announced by another peer, which is
    /// then not reported back.
    pub fn kill(&mut self, id: EntityId, remote: bool, ctx: &mut EntityContext<'_>) -> bool {
        let Some(entity) = self.entities.get_mut(&id) else {
            return false;
        };
        if remote {
            entity.core_mut().killed_remotely = true;
        }
        entity.kill(ctx);
        true
    }

    /// Removes `id` and its simulation object immediately.
    pub fn destroy(&mut self, id: EntityId, ctx: &mut EntityContext<'_>) -> bool {
        let Some(entity) = self.entities.remove(&id) else {
            return false;
        };
        if let Some(handle) = entity.core().handle {
            ctx.sim.destroy(handle);
        }
        self.tombstones.insert(id, entity.ty());
        true
    }

    /// Removes dead entries. Ids of deaths this peer is the authority for,
    /// and did not hear about from elsewhere, are pushed to `reported`.
    pub fn sweep(&mut self, ctx: &EntityContext<'_>, reported: &mut Vec<EntityId>) {
        let tombstones = &mut self.tombstones;
        self.entities.retain(|id, entity| {
            if !entity.core().dead {
                return true;
            }
            if entity.authority() == ctx.local && !entity.core().killed_remotely {
                reported.push(*id);
            }
            tombstones.insert(*id, entity.ty());
            false
        });
    }

    /// Runs [`Entity::update`] on every entry that is not yet dead.
    pub fn update_all(&mut self, ctx: &mut EntityContext<'_>) {
        for entity in self.entities.values_mut() {
            if !entity.core().dead {
                entity.update(ctx);
            }
        }
    }

    /// Live entities: not dead, not placeholders.
    pub fn alive(&self) -> impl Iterator<Item = &(dyn Entity + 'static)> + '_ {
        self.entities
            .values()
            .map(|e| &**e)
            .filter(|e| e.is_live())
    }

    /// Live entities `peer` is the authority for.
    pub fn owned_by(&self, peer: PeerId) -> impl Iterator<Item = &(dyn Entity + 'static)> + '_ {
        self.alive().filter(move |e| e.authority() == peer)
    }

    /// Live entities matching `predicate`.
    pub fn matching<'r, P>(&'r self, mut predicate: P) -> impl Iterator<Item = &'r (dyn Entity + 'static)> + 'r
    where
        P: FnMut(&dyn Entity) -> bool + 'r,
    {
        self.alive().filter(move |e| predicate(*e))
    }

    /// Number of live entities of `category`.
    #[must_use]
    pub fn count(&self, category: EntityCategory) -> usize {
        self.alive().filter(|e| e.ty().category() == category).count()
    }

    /// Hands every entity owned by `from` to `to`, ignoring lock windows.
    /// Returns how many moved.
    pub fn reassign(&mut self, from: PeerId, to: PeerId, ctx: &mut EntityContext<'_>) -> usize {
        let mut moved = 0;
        for entity in self.entities.values_mut() {
            if let Some(ownable) = entity.as_ownable_mut() {
                if ownable.owner() == from {
                    ownable.force_owner(to, ctx);
                    moved += 1;
                }
            }
        }
        moved
    }

    /// Removes everything but players, destroying simulation objects.
    /// Used on level change; the removed ids stay tombstoned.
    pub fn clear_level(&mut self, ctx: &mut EntityContext<'_>) {
        let ids: Vec<EntityId> = self
            .entities
            .values()
            .filter(|e| e.ty() != EntityType::Player)
            .map(|e| e.id())
            .collect();
        for id in ids {
            self.destroy(id, ctx);
        }
    }

    /// Removes everything and forgets all tombstones. The session is over.
    pub fn clear(&mut self, ctx: &mut EntityContext<'_>) {
        for entity in std::mem::take(&mut self.entities).into_values() {
            if let Some(handle) = entity.core().handle {
                ctx.sim.destroy(handle);
            }
        }
        self.tombstones.clear();
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.entities.len())
            .field("tombstones", &self.tombstones.len())
            .field("vendors", &self.vendors.len())
            .field("next", &self.next)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::ctx;
    use crate::entity::Player;
    use crate::simulation::{MockSimulation, Simulation};
    use tether_shared::Vec3;

    #[test]
    fn test_next_id_skips_players() {
        let mut lobby = Lobby::new(PeerId(1));
        lobby.join(PeerId(3));
        let mut registry = EntityRegistry::new(1);

        assert_eq!(registry.next_id(&lobby), EntityId(2));
        assert_eq!(registry.next_id(&lobby), EntityId(4));

        lobby.join(PeerId(5));
        assert_eq!(registry.next_id(&lobby), EntityId(6));
    }

    #[test]
    fn test_get_is_idempotent() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);

        assert!(registry.get(EntityId(10), EntityType::Coin, PeerId(2), &mut c).is_some());
        assert!(registry.get(EntityId(10), EntityType::Coin, PeerId(2), &mut c).is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(sim.object_count(), 1);
    }

    #[test]
    fn test_get_rejects_type_change() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);

        registry.get(EntityId(10), EntityType::Coin, PeerId(2), &mut c);
        assert!(registry.get(EntityId(10), EntityType::Rocket, PeerId(2), &mut c).is_none());
    }

    #[test]
    fn test_missing_vendor_fails_loudly() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::with_vendors(1, Vec::new());
        let mut c = ctx(1, 0.0, &mut sim);
        assert!(registry.get(EntityId(10), EntityType::Coin, PeerId(1), &mut c).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_index_only_types_never_enter() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);
        assert!(registry.get(EntityId(10), EntityType::Nailgun, PeerId(1), &mut c).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_destroyed_ids_are_not_reused() {
        let mut sim = MockSimulation::new();
        let lobby = Lobby::new(PeerId(1));
        let mut registry = EntityRegistry::new(2);
        let mut c = ctx(1, 0.0, &mut sim);

        let id = registry.next_id(&lobby);
        registry.get(id, EntityType::Grenade, PeerId(1), &mut c);
        assert!(registry.destroy(id, &mut c));

        assert!(registry.get(id, EntityType::Coin, PeerId(1), &mut c).is_none());
        assert!(registry.get(id, EntityType::Grenade, PeerId(1), &mut c).is_none());
        assert_ne!(registry.next_id(&lobby), id);
    }

    #[test]
    fn test_player_may_return() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);
        registry.get(EntityId(9), EntityType::Player, PeerId(9), &mut c);
        registry.destroy(EntityId(9), &mut c);
        assert!(registry.get(EntityId(9), EntityType::Player, PeerId(9), &mut c).is_some());
    }

    #[test]
    fn test_observe_identifies_native_objects() {
        let mut sim = MockSimulation::new();
        let torch = sim.spawn_native(EntityType::Torch, Vec3::Y);
        let revolver = sim.spawn_native(EntityType::Revolver, Vec3::ZERO);
        let lobby = Lobby::new(PeerId(1));
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);

        let id = registry.observe(torch, &lobby, &mut c).unwrap();
        assert_eq!(registry.find(id).map(|e| e.ty()), Some(EntityType::Torch));
        assert_eq!(registry.find(id).map(|e| e.authority()), Some(PeerId(1)));
        assert_eq!(registry.observe(revolver, &lobby, &mut c), None);
    }

    #[test]
    fn test_sweep_reports_only_own_unannounced_deaths() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);

        registry.get(EntityId(10), EntityType::Husk, PeerId(1), &mut c);
        registry.get(EntityId(11), EntityType::Husk, PeerId(1), &mut c);
        registry.get(EntityId(12), EntityType::Husk, PeerId(2), &mut c);
        registry.kill(EntityId(10), false, &mut c);
        registry.kill(EntityId(11), true, &mut c);
        registry.kill(EntityId(12), false, &mut c);
        assert_eq!(registry.alive().count(), 0);

        let mut reported = Vec::new();
        registry.sweep(&c, &mut reported);
        assert_eq!(reported, vec![EntityId(10)]);
        assert!(registry.is_empty());
        assert!(registry.is_tombstoned(EntityId(12)));
    }

    #[test]
    fn test_destroyed_object_is_swept() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let handle = {
            let mut c = ctx(1, 0.0, &mut sim);
            let entity = registry.get(EntityId(10), EntityType::Book, PeerId(1), &mut c).unwrap();
            entity.core().handle.unwrap()
        };
        sim.destroy(handle);

        let mut c = ctx(1, 0.1, &mut sim);
        registry.update_all(&mut c);
        let mut reported = Vec::new();
        registry.sweep(&c, &mut reported);
        assert_eq!(reported, vec![EntityId(10)]);
    }

    #[test]
    fn test_iteration_helpers() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        registry.insert(Box::new(Player::local(EntityId(1))));
        let mut c = ctx(1, 0.0, &mut sim);
        registry.get(EntityId(10), EntityType::Coin, PeerId(1), &mut c);
        registry.get(EntityId(11), EntityType::Coin, PeerId(2), &mut c);
        registry.get(EntityId(12), EntityType::Brute, PeerId(2), &mut c);

        assert_eq!(registry.alive().count(), 4);
        assert_eq!(registry.owned_by(PeerId(1)).count(), 2);
        assert_eq!(registry.owned_by(PeerId(2)).count(), 2);
        assert_eq!(
            registry.matching(|e| e.ty() == EntityType::Coin).count(),
            2
        );
        assert_eq!(registry.count(EntityCategory::Enemy), 1);
    }

    #[test]
    fn test_reassign_adopts_departed_peers_entities() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        let mut c = ctx(1, 0.0, &mut sim);
        registry.get(EntityId(10), EntityType::Coin, PeerId(2), &mut c);
        registry.get(EntityId(11), EntityType::Rocket, PeerId(2), &mut c);
        registry.get(EntityId(12), EntityType::Rocket, PeerId(3), &mut c);

        assert_eq!(registry.reassign(PeerId(2), PeerId(1), &mut c), 2);
        assert_eq!(registry.owned_by(PeerId(1)).count(), 2);
    }

    #[test]
    fn test_clear_level_keeps_players() {
        let mut sim = MockSimulation::new();
        let mut registry = EntityRegistry::new(1);
        registry.insert(Box::new(Player::local(EntityId(1))));
        let mut c = ctx(1, 0.0, &mut sim);
        registry.get(EntityId(2), EntityType::Player, PeerId(2), &mut c);
        registry.get(EntityId(10), EntityType::Coin, PeerId(1), &mut c);

        registry.clear_level(&mut c);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(EntityId(1)));
        assert!(registry.is_tombstoned(EntityId(10)));
        assert_eq!(sim.objects_of(EntityType::Coin).count(), 0);
    }
}
