//! # Client Endpoint
//!
//! Runs on every peer that is not the host. Sends only what this machine
//! owns, applies the host's broadcast, and obeys the host's directives.
//!
//! ```text
//!  Handshaking ──(host Version, compatible)──> Connected
//!       │                                          │
//!       └──────(mismatch / Kick)──────> Disconnected <┘
//! ```
//!
//! Only the host is listened to. A message from any other peer is ignored.

use super::{compatible, deliver, encode_packet, Endpoint, Io, NetEvent};
use crate::entity::Damage;
use crate::error::NetResult;
use crate::protocol::Packet;
use crate::session::Session;
use crate::simulation::Simulation;
use crate::snapshot::{self, SnapshotScope, Triple};
use crate::transport::Transport;
use tether_core::Arena;
use tether_shared::{EntityId, EntityType, KickReason, PacketType};

/// Where the client is in its connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Version sent, waiting for the host's.
    Handshaking,
    /// Versions agree.
    Connected,
    /// Kicked, refused, or the host left. Ticks do nothing.
    Disconnected,
}

/// The non-host role.
#[derive(Debug)]
pub struct Client {
    state: ClientState,
    version_sent: bool,
    triples: Vec<Triple>,
    reported: Vec<EntityId>,
    events: Vec<NetEvent>,
    snapshots_applied: u64,
}

impl Client {
    /// Fresh client that greets the host on its first tick.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ClientState::Handshaking,
            version_sent: false,
            triples: Vec::new(),
            reported: Vec::new(),
            events: Vec::new(),
            snapshots_applied: 0,
        }
    }

    /// Connection state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// Host snapshots applied so far.
    #[inline]
    #[must_use]
    pub const fn snapshots_applied(&self) -> u64 {
        self.snapshots_applied
    }

    fn receive(&mut self, kind: PacketType, bytes: &[u8], io: &mut Io<'_>) {
        if kind == PacketType::Snapshot {
            self.apply_snapshot(bytes, io);
            return;
        }
        let packet = match Packet::decode(kind, bytes) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(?kind, %error, "malformed directive from host");
                return;
            }
        };

        match packet {
            Packet::Version {
                major,
                minor,
                patch,
                ..
            } => {
                let ours = io.session.config.protocol_version;
                if compatible(ours, (major, minor, patch)) {
                    tracing::info!(host = %io.session.lobby.host(), "connected");
                    self.state = ClientState::Connected;
                } else {
                    tracing::warn!(?ours, theirs = ?(major, minor, patch), "version mismatch");
                    self.disconnect(KickReason::VersionMismatch, io);
                }
            }
            Packet::Kick { reason } => self.disconnect(reason, io),
            Packet::LoadLevel { level } => {
                io.sim.load_level(level);
                io.session.level = Some(level.to_owned());
                let mut ctx = io.session.context(&mut *io.sim);
                io.session.registry.clear_level(&mut ctx);
                tracing::info!(level, "level loaded");
            }
            Packet::DamageEntity {
                sender,
                target,
                amount,
                kind: damage_kind,
                direction,
            } => {
                let damage = Damage {
                    source: sender,
                    amount,
                    kind: damage_kind,
                    direction,
                };
                let mut ctx = io.session.context(&mut *io.sim);
                if let Some(entity) = io.session.registry.find_mut(target) {
                    entity.damage(&damage, &mut ctx);
                }
            }
            Packet::KillEntity { target, .. } => {
                let mut ctx = io.session.context(&mut *io.sim);
                io.session.registry.kill(target, true, &mut ctx);
            }
            Packet::DestroyEntity { target } => {
                let departed = io
                    .session
                    .registry
                    .find(target)
                    .is_some_and(|e| e.ty() == EntityType::Player);
                let mut ctx = io.session.context(&mut *io.sim);
                io.session.registry.destroy(target, &mut ctx);
                let peer = target.peer();
                if departed && peer != io.session.local && io.session.lobby_mut().leave(peer) {
                    tracing::debug!(%peer, "peer left");
                }
            }
            other => {
                if let Some(event) = NetEvent::from_packet(&other) {
                    self.events.push(event);
                }
            }
        }
    }

    fn apply_snapshot(&mut self, bytes: &[u8], io: &mut Io<'_>) {
        if let Err(error) = snapshot::decode_into(bytes, &mut self.triples) {
            tracing::warn!(%error, "malformed snapshot from host");
            return;
        }
        Self::learn_members(&self.triples, io.session);
        let mut ctx = io.session.context(&mut *io.sim);
        snapshot::apply(&mut io.session.registry, &self.triples, &mut ctx);
        self.snapshots_applied += 1;
    }

    /// The host's broadcast carries every connected player, so a player
    /// triple for a peer not yet in the lobby means that peer joined.
    fn learn_members(triples: &[Triple], session: &mut Session) {
        for triple in triples.iter().filter(|t| t.ty == EntityType::Player) {
            let peer = triple.id.peer();
            if session.lobby_mut().join(peer) {
                tracing::debug!(%peer, "peer joined");
            }
        }
    }

    fn disconnect(&mut self, reason: KickReason, io: &mut Io<'_>) {
        tracing::warn!(?reason, "left session");
        let host = io.session.lobby.host();
        io.sim.return_to_menu(reason.message());
        io.transport.close(host);
        io.session.teardown(&mut *io.sim);
        self.state = ClientState::Disconnected;
        self.events.push(NetEvent::Disconnected { reason });
    }

    /// Channels in drain order. Directives go first so a level change is
    /// applied before any snapshot of the new level.
    fn drain_order() -> impl Iterator<Item = PacketType> {
        PacketType::ALL
            .into_iter()
            .filter(|kind| *kind != PacketType::Snapshot)
            .chain(std::iter::once(PacketType::Snapshot))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Endpoint for Client {
    fn tick(
        &mut self,
        session: &mut Session,
        sim: &mut dyn Simulation,
        transport: &mut dyn Transport,
        arena: &mut Arena,
    ) -> NetResult<()> {
        arena.reset();
        if self.state == ClientState::Disconnected {
            return Ok(());
        }
        let mut io = Io {
            session,
            sim,
            transport,
            arena,
        };
        let host = io.session.lobby.host();

        if !self.version_sent {
            let (major, minor, patch) = io.session.config.protocol_version;
            let version = Packet::Version {
                sender: io.session.local,
                major,
                minor,
                patch,
            };
            io.send_to(host, &version)?;
            self.version_sent = true;
        }

        for kind in Self::drain_order() {
            while let Some((from, bytes)) = io.transport.recv(kind) {
                if from != host {
                    tracing::trace!(%from, ?kind, "ignoring message not from host");
                    continue;
                }
                self.receive(kind, &bytes, &mut io);
                if self.state == ClientState::Disconnected {
                    return Ok(());
                }
            }
        }

        let mut reported = std::mem::take(&mut self.reported);
        {
            let mut ctx = io.session.context(&mut *io.sim);
            io.session.registry.update_all(&mut ctx);
            io.session.registry.sweep(&ctx, &mut reported);
        }
        let local = io.session.local;
        for target in reported.drain(..) {
            io.send_to(host, &Packet::KillEntity { sender: local, target })?;
        }
        self.reported = reported;

        {
            let ctx = io.session.context(&mut *io.sim);
            let bytes = snapshot::encode(
                &io.session.registry,
                SnapshotScope::OwnedBy(local),
                &ctx,
                &mut *io.arena,
            )?;
            if !bytes.is_empty() {
                deliver(&mut *io.transport, host, PacketType::Snapshot, bytes);
            }
        }

        io.session.advance();
        Ok(())
    }

    fn send(
        &mut self,
        session: &Session,
        transport: &mut dyn Transport,
        arena: &mut Arena,
        packet: &Packet<'_>,
    ) -> NetResult<()> {
        if self.state == ClientState::Disconnected {
            return Ok(());
        }
        let bytes = encode_packet(packet, arena)?;
        deliver(transport, session.host_peer(), packet.kind(), bytes);
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<NetEvent> {
        std::mem::take(&mut self.events)
    }
}
