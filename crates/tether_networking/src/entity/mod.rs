//! # Replicated Entities
//!
//! An [`Entity`] is the network-side twin of one simulation object. It owns
//! the snapshot contract for its type: [`Entity::snapshot`] produces the
//! payload this peer would send, [`Entity::apply`] consumes a payload that
//! arrived from elsewhere.
//!
//! ## Authority
//!
//! ```text
//!                     snapshot()                       apply()
//!  authority  ── reads the simulation ──>  wire  ── discarded (already true)
//!  others     ── reports last remote   ──>  wire  ── pushed into Interpolated
//! ```
//!
//! Players are always their own authority. Every other replicated kind is an
//! [`OwnableEntity`] whose authority floats between peers.
//!
//! ## Per-kind authority
//!
//! | Kind       | Created by                      | Fixed at creation | Owner writes                     |
//! |------------|---------------------------------|-------------------|----------------------------------|
//! | Player     | its own peer                    | type              | everything                       |
//! | Enemy      | host, clients for non-bosses    | type, max health  | health, transform, flags         |
//! | Item       | any peer                        | type              | transform, flags, holder         |
//! | Coin       | any peer                        | type, team        | position, velocity, flags, power |
//! | Projectile | any peer                        | type              | position, direction, flags, rider|

mod coin;
mod enemy;
mod item;
mod payload;
mod player;
mod projectile;

pub use coin::Coin;
pub use enemy::{Enemy, EnemyDescriptor};
pub use item::Item;
pub use payload::{
    coin_flags, enemy_flags, item_flags, player_flags, projectile_flags, CoinPayload, EnemyPayload,
    EntityPayload, ItemPayload, PlayerPayload, ProjectilePayload, TRIPLE_HEADER_SIZE,
};
pub use player::Player;
pub use projectile::Projectile;

use crate::error::CodecResult;
use crate::interpolation::Interpolated;
use crate::ownership::{OwnableEntity, Ownership};
use crate::protocol::{Reader, Writer};
use crate::simulation::{ObjectHandle, Simulation};
use tether_shared::{DamageKind, EntityId, EntityType, PeerId, Vec3};

/// Everything an entity may consult or mutate while it runs.
pub struct EntityContext<'a> {
    /// This machine.
    pub local: PeerId,
    /// The session host.
    pub host: PeerId,
    /// Session time in seconds.
    pub now: f64,
    /// Seconds between snapshots, the interpolation interval.
    pub spacing: f32,
    /// Ownership cooldown in seconds.
    pub lock_window: f32,
    /// The game.
    pub sim: &'a mut dyn Simulation,
}

impl EntityContext<'_> {
    /// Whether this machine is the host.
    #[inline]
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.local == self.host
    }
}

/// State every entity carries regardless of kind.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityCore {
    /// Identifier, unique among live entities.
    pub id: EntityId,
    /// Type tag, fixed for the entity's life.
    pub ty: EntityType,
    /// Session time of the last applied remote snapshot.
    pub last_update: f64,
    /// Placeholder without a simulation object.
    pub hidden: bool,
    /// Dead, removal pending.
    pub dead: bool,
    /// The death was announced by another peer, so it must not be echoed.
    pub killed_remotely: bool,
    /// Bound simulation object.
    pub handle: Option<ObjectHandle>,
}

impl EntityCore {
    /// Core for an entity bound to `handle`. Without one it starts as a
    /// placeholder.
    #[must_use]
    pub const fn new(id: EntityId, ty: EntityType, handle: Option<ObjectHandle>) -> Self {
        Self {
            id,
            ty,
            last_update: 0.0,
            hidden: handle.is_none(),
            dead: false,
            killed_remotely: false,
            handle,
        }
    }
}

/// A hit on an entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Damage {
    /// Attacker.
    pub source: PeerId,
    /// Amount in health points.
    pub amount: f32,
    /// What dealt it.
    pub kind: DamageKind,
    /// Push direction.
    pub direction: Vec3,
}

/// A replicated object.
pub trait Entity {
    /// Shared state.
    fn core(&self) -> &EntityCore;

    /// Shared state, mutable.
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Identifier.
    fn id(&self) -> EntityId {
        self.core().id
    }

    /// Type tag.
    fn ty(&self) -> EntityType {
        self.core().ty
    }

    /// Peer whose snapshot is the truth for the live fields.
    fn authority(&self) -> PeerId;

    /// Payload this peer reports for the entity.
    fn snapshot(&self, ctx: &EntityContext<'_>) -> EntityPayload;

    /// Consumes a remote payload. A payload of another category is ignored.
    fn apply(&mut self, payload: &EntityPayload, ctx: &mut EntityContext<'_>);

    /// Encodes [`Entity::snapshot`].
    ///
    /// # Errors
    ///
    /// [`crate::error::CodecError::WriteOverflow`] if the buffer is too small.
    fn write(&self, w: &mut Writer<'_>, ctx: &EntityContext<'_>) -> CodecResult<()> {
        self.snapshot(ctx).write(w)
    }

    /// Decodes a payload of this entity's type and applies it.
    ///
    /// # Errors
    ///
    /// Any read-side [`crate::error::CodecError`]. Nothing is applied then.
    fn read(&mut self, r: &mut Reader<'_>, ctx: &mut EntityContext<'_>) -> CodecResult<()> {
        let payload = EntityPayload::read(self.ty(), r)?;
        self.apply(&payload, ctx);
        Ok(())
    }

    /// Per-tick work: drives interpolated state into the simulation and
    /// notices objects the simulation removed.
    fn update(&mut self, ctx: &mut EntityContext<'_>);

    /// Takes a hit. Only the authority changes anything.
    fn damage(&mut self, damage: &Damage, ctx: &mut EntityContext<'_>);

    /// Marks the entity dead and plays its death.
    fn kill(&mut self, ctx: &mut EntityContext<'_>) {
        let core = self.core_mut();
        if core.dead {
            return;
        }
        core.dead = true;
        if let Some(handle) = core.handle {
            ctx.sim.kill(handle);
        }
    }

    /// Neither dead nor a placeholder.
    fn is_live(&self) -> bool {
        let core = self.core();
        !core.hidden && !core.dead
    }

    /// Ownership view, for kinds that have one.
    fn as_ownable(&self) -> Option<&dyn OwnableEntity> {
        None
    }

    /// Mutable ownership view, for kinds that have one.
    fn as_ownable_mut(&mut self) -> Option<&mut dyn OwnableEntity> {
        None
    }
}

/// Owner, transform and interpolation state shared by the ownable kinds.
#[derive(Clone, Debug)]
pub struct Body {
    /// Current owner and lock window.
    pub ownership: Ownership,
    /// Remote position.
    pub position: Interpolated<Vec3>,
    /// Remote rotation, or direction for kinds that have no rotation.
    pub rotation: Interpolated<Vec3>,
}

impl Body {
    /// Body owned by `owner`, at rest.
    #[must_use]
    pub fn new(owner: PeerId, position: Vec3, rotation: Vec3, lock_window: f32) -> Self {
        Self {
            ownership: Ownership::new(owner, lock_window),
            position: Interpolated::new(position),
            rotation: Interpolated::new(rotation),
        }
    }

    /// Whether this machine drives the body.
    #[inline]
    #[must_use]
    pub fn is_mine(&self, ctx: &EntityContext<'_>) -> bool {
        self.ownership.owner() == ctx.local
    }

    /// Owners simulate physics, everyone else drives the object.
    pub fn on_transfer(&self, handle: Option<ObjectHandle>, ctx: &mut EntityContext<'_>) {
        if let Some(handle) = handle {
            let mine = self.is_mine(ctx);
            ctx.sim.set_kinematic(handle, !mine);
        }
    }

    /// Position to report: the simulation's if this peer owns the body,
    /// otherwise the last remote value.
    #[must_use]
    pub fn report_position(&self, handle: Option<ObjectHandle>, ctx: &EntityContext<'_>) -> Vec3 {
        match handle {
            Some(h) if self.is_mine(ctx) => ctx.sim.position(h).unwrap_or(self.position.target()),
            _ => self.position.target(),
        }
    }

    /// Rotation to report, same rule as [`Body::report_position`].
    #[must_use]
    pub fn report_rotation(&self, handle: Option<ObjectHandle>, ctx: &EntityContext<'_>) -> Vec3 {
        match handle {
            Some(h) if self.is_mine(ctx) => ctx.sim.rotation(h).unwrap_or(self.rotation.target()),
            _ => self.rotation.target(),
        }
    }

    /// Stores a remote transform.
    pub fn push(&mut self, position: Vec3, rotation: Vec3, ctx: &EntityContext<'_>) {
        self.position.push(position, ctx.now, ctx.spacing);
        self.rotation.push(rotation, ctx.now, ctx.spacing);
    }

    /// Writes the blended transform into the object, unless this peer owns it.
    pub fn drive(&self, handle: Option<ObjectHandle>, ctx: &mut EntityContext<'_>) {
        let Some(handle) = handle else { return };
        if self.is_mine(ctx) {
            return;
        }
        let position = self.position.sample(ctx.now, ctx.spacing);
        let rotation = self.rotation.sample(ctx.now, ctx.spacing);
        ctx.sim.set_position(handle, position);
        ctx.sim.set_rotation(handle, rotation);
    }
}

/// Marks `core` dead when its simulation object is gone.
pub(crate) fn notice_destroyed(core: &mut EntityCore, ctx: &EntityContext<'_>) {
    if let Some(handle) = core.handle {
        if !core.dead && !ctx.sim.exists(handle) {
            core.dead = true;
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::EntityContext;
    use crate::simulation::Simulation;
    use tether_shared::PeerId;

    /// Context at `now` for `local`, host is peer 1, 10 Hz snapshots.
    pub fn ctx(local: u64, now: f64, sim: &mut dyn Simulation) -> EntityContext<'_> {
        EntityContext {
            local: PeerId(local),
            host: PeerId(1),
            now,
            spacing: 0.1,
            lock_window: 1.0,
            sim,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ctx;
    use super::*;
    use crate::simulation::MockSimulation;

    #[test]
    fn test_core_without_handle_is_placeholder() {
        let core = EntityCore::new(EntityId(5), EntityType::Coin, None);
        assert!(core.hidden);
        let core = EntityCore::new(EntityId(5), EntityType::Coin, Some(ObjectHandle(0)));
        assert!(!core.hidden);
    }

    #[test]
    fn test_body_reports_sim_only_when_owned() {
        let mut sim = MockSimulation::new();
        let h = sim.spawn_native(EntityType::Torch, Vec3::new(4.0, 0.0, 0.0));
        let body = Body::new(PeerId(2), Vec3::ZERO, Vec3::ZERO, 1.0);

        let owner_view = ctx(2, 0.0, &mut sim);
        assert_eq!(body.report_position(Some(h), &owner_view), Vec3::new(4.0, 0.0, 0.0));

        let other_view = ctx(3, 0.0, &mut sim);
        assert_eq!(body.report_position(Some(h), &other_view), Vec3::ZERO);
    }

    #[test]
    fn test_body_drives_only_when_remote() {
        let mut sim = MockSimulation::new();
        let h = sim.spawn_native(EntityType::Torch, Vec3::ZERO);
        let mut body = Body::new(PeerId(2), Vec3::ZERO, Vec3::ZERO, 1.0);

        let mut c = ctx(3, 1.0, &mut sim);
        body.push(Vec3::Y, Vec3::ZERO, &c);
        c.now = 2.0;
        body.drive(Some(h), &mut c);
        assert_eq!(sim.position(h), Some(Vec3::Y));

        let mut c = ctx(2, 3.0, &mut sim);
        body.push(Vec3::new(9.0, 9.0, 9.0), Vec3::ZERO, &c);
        c.now = 4.0;
        body.drive(Some(h), &mut c);
        assert_eq!(sim.position(h), Some(Vec3::Y));
    }
}
