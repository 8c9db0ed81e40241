//! Carriable items: skulls, torches, books, plushies.

use super::{
    item_flags, notice_destroyed, Body, Damage, Entity, EntityContext, EntityCore, EntityPayload,
    ItemPayload,
};
use crate::ownership::{OwnableEntity, Ownership};
use crate::simulation::ObjectHandle;
use tether_shared::{EntityId, EntityType, PeerId, Vec3};

/// A physics item players can pick up.
#[derive(Clone, Debug)]
pub struct Item {
    core: EntityCore,
    body: Body,
    flags: u8,
    holder: Option<PeerId>,
}

impl Item {
    /// Item of kind `ty` owned by `owner`.
    #[must_use]
    pub fn new(
        id: EntityId,
        ty: EntityType,
        owner: PeerId,
        handle: Option<ObjectHandle>,
        ctx: &mut EntityContext<'_>,
    ) -> Self {
        let position = handle.and_then(|h| ctx.sim.position(h)).unwrap_or(Vec3::ZERO);
        let rotation = handle.and_then(|h| ctx.sim.rotation(h)).unwrap_or(Vec3::ZERO);
        let item = Self {
            core: EntityCore::new(id, ty, handle),
            body: Body::new(owner, position, rotation, ctx.lock_window),
            flags: 0,
            holder: None,
        };
        item.body.on_transfer(handle, ctx);
        item
    }

    /// Player holding the item.
    #[must_use]
    pub const fn holder(&self) -> Option<PeerId> {
        self.holder
    }

    /// The local player picks the item up and takes ownership of it.
    pub fn pick_up(&mut self, ctx: &mut EntityContext<'_>) {
        self.take_ownage(ctx);
        self.flags &= !item_flags::PLACED;
        self.set_holder(Some(ctx.local), ctx);
    }

    /// The local player sets the item on an altar or pedestal.
    pub fn place(&mut self, ctx: &mut EntityContext<'_>) {
        self.take_ownage(ctx);
        self.flags |= item_flags::PLACED;
        self.set_holder(None, ctx);
    }

    /// The holder lets go. Ownership stays until someone else takes it.
    pub fn drop_held(&mut self, ctx: &mut EntityContext<'_>) {
        self.set_holder(None, ctx);
    }

    fn set_holder(&mut self, holder: Option<PeerId>, ctx: &mut EntityContext<'_>) {
        if self.holder == holder {
            return;
        }
        self.holder = holder;
        if let Some(h) = self.core.handle {
            ctx.sim.set_holder(h, holder);
        }
    }
}

impl Entity for Item {
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
        EntityPayload::Item(ItemPayload {
            owner: self.body.ownership.owner(),
            position: self.body.report_position(handle, ctx),
            rotation: self.body.report_rotation(handle, ctx),
            flags: self.flags,
            holder: self.holder,
        })
    }

    fn apply(&mut self, payload: &EntityPayload, ctx: &mut EntityContext<'_>) {
        let EntityPayload::Item(p) = payload else {
            tracing::warn!(entity = %self.core.id, "item received a foreign payload");
            return;
        };
        self.sync_owner(p.owner, ctx);
        if self.body.is_mine(ctx) {
            return;
        }
        self.flags = p.flags;
        self.set_holder(p.holder, ctx);
        self.body.push(p.position, p.rotation, ctx);
        self.core.last_update = ctx.now;
    }

    fn update(&mut self, ctx: &mut EntityContext<'_>) {
        notice_destroyed(&mut self.core, ctx);
        if !self.core.dead {
            self.body.drive(self.core.handle, ctx);
        }
    }

    fn damage(&mut self, _damage: &Damage, _ctx: &mut EntityContext<'_>) {}

    fn as_ownable(&self) -> Option<&dyn OwnableEntity> {
        Some(self)
    }

    fn as_ownable_mut(&mut self) -> Option<&mut dyn OwnableEntity> {
        Some(self)
    }
}

impl OwnableEntity for Item {
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
