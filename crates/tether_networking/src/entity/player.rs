//! Player dolls and the local player.
//!
//! A player's entity id is its peer id, so every peer can find any player
//! without a lookup. The local player has no doll: its state is read from
//! [`Simulation::local_player`](crate::simulation::Simulation::local_player).

use super::{notice_destroyed, Damage, Entity, EntityContext, EntityCore, EntityPayload, PlayerPayload};
use crate::interpolation::Interpolated;
use crate::protocol::PlayerState;
use crate::simulation::{ObjectHandle, PlayerPose};
use tether_shared::{EntityId, EntityType, PeerId, Vec3};

/// A human player.
#[derive(Clone, Debug)]
pub struct Player {
    core: EntityCore,
    health: u8,
    position: Interpolated<Vec3>,
    yaw: Interpolated<f32>,
    pitch: Interpolated<f32>,
    state: PlayerState,
    flags: u8,
    hook: Option<Vec3>,
}

impl Player {
    fn with_core(core: EntityCore) -> Self {
        Self {
            core,
            health: 100,
            position: Interpolated::new(Vec3::ZERO),
            yaw: Interpolated::new(0.0),
            pitch: Interpolated::new(0.0),
            state: PlayerState::default(),
            flags: 0,
            hook: None,
        }
    }

    /// The player controlled on this machine.
    #[must_use]
    pub fn local(id: EntityId) -> Self {
        let mut core = EntityCore::new(id, EntityType::Player, None);
        core.hidden = false;
        Self::with_core(core)
    }

    /// Another peer's player, shown through the doll `handle`.
    #[must_use]
    pub fn remote(id: EntityId, handle: Option<ObjectHandle>) -> Self {
        Self::with_core(EntityCore::new(id, EntityType::Player, handle))
    }

    /// Last known health.
    #[must_use]
    pub const fn health(&self) -> u8 {
        self.health
    }

    /// Last known team, weapon and emote.
    #[must_use]
    pub const fn state(&self) -> PlayerState {
        self.state
    }

    fn is_local(&self, ctx: &EntityContext<'_>) -> bool {
        self.core.id.peer() == ctx.local
    }
}

impl Entity for Player {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn authority(&self) -> PeerId {
        self.core.id.peer()
    }

    fn snapshot(&self, ctx: &EntityContext<'_>) -> EntityPayload {
        if self.is_local(ctx) {
            let local = ctx.sim.local_player();
            return EntityPayload::Player(PlayerPayload {
                health: local.health,
                position: local.position,
                yaw: local.pose.yaw,
                pitch: local.pose.pitch,
                state: local.pose.state,
                flags: local.pose.flags,
                hook: local.pose.hook,
            });
        }
        EntityPayload::Player(PlayerPayload {
            health: self.health,
            position: self.position.target(),
            yaw: self.yaw.target(),
            pitch: self.pitch.target(),
            state: self.state,
            flags: self.flags,
            hook: self.hook,
        })
    }

    fn apply(&mut self, payload: &EntityPayload, ctx: &mut EntityContext<'_>) {
        let EntityPayload::Player(p) = payload else {
            tracing::warn!(entity = %self.core.id, "player received a foreign payload");
            return;
        };
        if self.is_local(ctx) {
            return;
        }
        self.health = p.health;
        self.position.push(p.position, ctx.now, ctx.spacing);
        self.yaw.push(p.yaw, ctx.now, ctx.spacing);
        self.pitch.push(p.pitch, ctx.now, ctx.spacing);
        self.state = p.state;
        self.flags = p.flags;
        self.hook = p.hook;
        self.core.last_update = ctx.now;
    }

    fn update(&mut self, ctx: &mut EntityContext<'_>) {
        notice_destroyed(&mut self.core, ctx);
        if self.is_local(ctx) || self.core.dead {
            return;
        }
        let Some(handle) = self.core.handle else { return };
        ctx.sim
            .set_position(handle, self.position.sample(ctx.now, ctx.spacing));
        let pose = PlayerPose {
            yaw: self.yaw.sample(ctx.now, ctx.spacing),
            pitch: self.pitch.sample(ctx.now, ctx.spacing),
            state: self.state,
            flags: self.flags,
            hook: self.hook,
        };
        ctx.sim.pose_player(handle, &pose);
    }

    fn damage(&mut self, damage: &Damage, ctx: &mut EntityContext<'_>) {
        if self.is_local(ctx) {
            ctx.sim.damage_local_player(damage.amount, damage.kind);
        }
    }
}
