//! # Session
//!
//! Everything one peer knows about one multiplayer session, created when the
//! session starts and torn down when it ends. Nothing here is global; two
//! sessions in one process never share state.
//!
//! ```text
//! Session
//!  ├── local / lobby       who we are, who else is here
//!  ├── registry            entities and vendors
//!  ├── clock               fixed-step session time
//!  └── config / policy     tunables
//! ```

use crate::entity::{EntityContext, Player};
use crate::lobby::Lobby;
use crate::ownership::OwnableEntity;
use crate::policy::SpawnPolicy;
use crate::registry::EntityRegistry;
use crate::simulation::{ObjectHandle, Simulation};
use serde::Deserialize;
use tether_core::SessionClock;
use tether_shared::constants::DEFAULT_ARENA_CAPACITY;
use tether_shared::{EntityId, EntityType, PeerId, Vec3, DEFAULT_TICK_RATE, LOCK_WINDOW_SECS, PROTOCOL_VERSION};

/// Replication tunables.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Ticks (and snapshots) per second.
    pub tick_rate: u32,
    /// Ownership cooldown after a transfer, in seconds.
    pub lock_window_secs: f32,
    /// Bytes of per-tick scratch memory per endpoint.
    pub arena_capacity: usize,
    /// Incoming messages larger than this are rejected unread.
    pub max_message_size: usize,
    /// Clients may create ordinary enemies.
    pub allow_client_enemies: bool,
    /// Width of each peer's block of fresh entity ids. Ids below the first
    /// block are never issued; they are left to players' account ids.
    pub client_id_block: u64,
    /// Version this build speaks, `(major, minor, patch)`.
    pub protocol_version: (u8, u8, u8),
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            lock_window_secs: LOCK_WINDOW_SECS,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            max_message_size: 64 * 1024,
            allow_client_enemies: true,
            client_id_block: 1_000_000,
            protocol_version: PROTOCOL_VERSION,
        }
    }
}

/// Start of the fresh-id block for lobby `slot`. The host is slot 0 and
/// issues from one block up.
fn first_id(slot: u64, block: u64) -> u64 {
    slot.saturating_add(1).saturating_mul(block.max(1))
}

/// One peer's view of a session.
#[derive(Debug)]
pub struct Session {
    pub(crate) local: PeerId,
    pub(crate) lobby: Lobby,
    pub(crate) registry: EntityRegistry,
    pub(crate) clock: SessionClock,
    pub(crate) config: NetworkConfig,
    pub(crate) policy: SpawnPolicy,
    pub(crate) level: Option<String>,
}

impl Session {
    fn new(local: PeerId, lobby: Lobby, first_id: u64, config: NetworkConfig) -> Self {
        let mut registry = EntityRegistry::new(first_id);
        registry.insert(Box::new(Player::local(local.entity())));
        Self {
            local,
            lobby,
            registry,
            clock: SessionClock::new(config.tick_rate),
            policy: SpawnPolicy {
                allow_client_enemies: config.allow_client_enemies,
            },
            config,
            level: None,
        }
    }

    /// Session hosted by `local`.
    #[must_use]
    pub fn host(local: PeerId, config: NetworkConfig) -> Self {
        tracing::info!(%local, "hosting session");
        let first_id = first_id(0, config.client_id_block);
        Self::new(local, Lobby::new(local), first_id, config)
    }

    /// Session joined by `local`. `members` are the peers already present
    /// besides the host, in join order.
    #[must_use]
    pub fn join(local: PeerId, host: PeerId, members: &[PeerId], config: NetworkConfig) -> Self {
        let mut lobby = Lobby::new(host);
        for member in members {
            lobby.join(*member);
        }
        lobby.join(local);
        let slot = lobby.slot_of(local).unwrap_or(0) as u64;
        let first_id = first_id(slot, config.client_id_block);
        tracing::info!(%local, %host, slot, first_id, "joined session");
        Self::new(local, lobby, first_id, config)
    }

    /// This machine.
    #[inline]
    #[must_use]
    pub const fn local(&self) -> PeerId {
        self.local
    }

    /// The host.
    #[inline]
    #[must_use]
    pub const fn host_peer(&self) -> PeerId {
        self.lobby.host()
    }

    /// Whether this machine hosts.
    #[inline]
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.local == self.lobby.host()
    }

    /// Connected peers.
    #[must_use]
    pub const fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    /// Connected peers, for membership changes reported by the lobby service.
    pub fn lobby_mut(&mut self) -> &mut Lobby {
        &mut self.lobby
    }

    /// Known entities.
    #[must_use]
    pub const fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Known entities, mutable.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Session clock.
    #[must_use]
    pub const fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Tunables.
    #[must_use]
    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Creation rules.
    #[must_use]
    pub const fn policy(&self) -> &SpawnPolicy {
        &self.policy
    }

    /// Current level, once one was loaded.
    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    /// Context for entity calls at the current session time.
    pub fn context<'s>(&self, sim: &'s mut dyn Simulation) -> EntityContext<'s> {
        EntityContext {
            local: self.local,
            host: self.lobby.host(),
            now: self.clock.now(),
            spacing: self.clock.step(),
            lock_window: self.config.lock_window_secs,
            sim,
        }
    }

    /// Registers an object the game spawned on its own. This peer owns it.
    pub fn observe(&mut self, handle: ObjectHandle, sim: &mut dyn Simulation) -> Option<EntityId> {
        let mut ctx = self.context(sim);
        self.registry.observe(handle, &self.lobby, &mut ctx)
    }

    /// Spawns a new locally owned entity of kind `ty` at `position`.
    pub fn spawn(&mut self, ty: EntityType, position: Vec3, sim: &mut dyn Simulation) -> Option<EntityId> {
        let handle = sim.spawn(ty)?;
        sim.set_position(handle, position);
        let mut ctx = self.context(sim);
        let id = self.registry.observe_as(handle, ty, &self.lobby, &mut ctx);
        if id.is_none() {
            ctx.sim.destroy(handle);
        }
        id
    }

    /// Claims an ownable entity for this machine.
    pub fn take_ownage(&mut self, id: EntityId, sim: &mut dyn Simulation) -> bool {
        let mut ctx = self.context(sim);
        let Some(ownable) = self
            .registry
            .find_mut(id)
            .and_then(|e| e.as_ownable_mut())
        else {
            return false;
        };
        ownable.take_ownage(&mut ctx);
        true
    }

    /// Moves the clock one tick forward.
    pub fn advance(&mut self) {
        self.clock.advance();
    }

    /// Ends the session: every entity and simulation object goes away.
    pub fn teardown(&mut self, sim: &mut dyn Simulation) {
        let mut ctx = self.context(sim);
        self.registry.clear(&mut ctx);
        self.level = None;
        self.clock.reset();
        tracing::info!(local = %self.local, "session torn down");
    }
}
