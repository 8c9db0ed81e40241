//! # Server Endpoint
//!
//! Runs on the host. Accepts per-peer snapshots, relays directives, and
//! broadcasts one snapshot of every live entity per tick.
//!
//! ## Inbound checks
//!
//! ```text
//! message ──> known peer? ──> Administration::on_traffic ──> size limit
//!                                                              │
//!          ┌──────────────┬───────────────┬─────────────┬──────┴──────┐
//!       Snapshot       Redirect         Apply        HostOnly     Handshake
//!   decode all,     sender check,   sender check,   violation    version check
//!   admission,      relay bytes     apply, relay
//!   then apply
//! ```
//!
//! Any failed check drops the whole message and is reported to the
//! [`Administration`], whose verdict may end in a ban.

use super::{compatible, Endpoint, Io, NetEvent};
use crate::admin::{Administration, PermissiveAdministration, Verdict, Violation};
use crate::entity::Damage;
use crate::error::{AdmissionError, NetResult};
use crate::protocol::Packet;
use crate::session::Session;
use crate::simulation::Simulation;
use crate::snapshot::{self, SnapshotScope, Triple};
use crate::transport::Transport;
use tether_core::Arena;
use tether_shared::constants::MAX_PEERS;
use tether_shared::{EntityId, EntityType, KickReason, PacketType, PeerId, RelayClass};

/// Server counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Messages accepted and processed.
    pub messages_processed: u64,
    /// Messages dropped for any reason.
    pub messages_dropped: u64,
    /// Rule violations seen.
    pub violations: u64,
    /// Entities created from client snapshots.
    pub entities_admitted: u64,
    /// Snapshots broadcast.
    pub snapshots_sent: u64,
    /// Peers removed by the host.
    pub kicks: u64,
}

/// The host role.
pub struct Server {
    admin: Box<dyn Administration>,
    welcome: Vec<PeerId>,
    triples: Vec<Triple>,
    reported: Vec<EntityId>,
    events: Vec<NetEvent>,
    stats: ServerStats,
}

impl Server {
    /// Server consulting `admin` for abuse control.
    #[must_use]
    pub fn new(admin: Box<dyn Administration>) -> Self {
        Self {
            admin,
            welcome: Vec::new(),
            triples: Vec::new(),
            reported: Vec::new(),
            events: Vec::new(),
            stats: ServerStats::default(),
        }
    }

    /// Server that only enforces manual bans.
    #[must_use]
    pub fn permissive() -> Self {
        Self::new(Box::new(PermissiveAdministration::new()))
    }

    /// Counters.
    #[must_use]
    pub const fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Abuse control.
    #[must_use]
    pub fn admin(&self) -> &dyn Administration {
        self.admin.as_ref()
    }

    /// Lets `peer` into the session. It is greeted with the host's version
    /// and current level on the next tick.
    ///
    /// # Errors
    ///
    /// [`AdmissionError`] if the peer is banned, already present, the
    /// session is full, or its player id is held by another entity.
    pub fn admit(&mut self, peer: PeerId, session: &mut Session) -> Result<(), AdmissionError> {
        if self.admin.is_banned(peer) {
            tracing::warn!(%peer, "banned peer refused");
            return Err(AdmissionError::Banned(peer));
        }
        if session.lobby.contains(peer) {
            return Err(AdmissionError::AlreadyConnected(peer));
        }
        if session.lobby.len() >= MAX_PEERS {
            return Err(AdmissionError::SessionFull(MAX_PEERS));
        }
        if session.registry.holds_object(peer.entity()) {
            tracing::warn!(%peer, "player id already names an entity, refused");
            return Err(AdmissionError::IdInUse(peer));
        }
        session.lobby.join(peer);
        self.welcome.push(peer);
        tracing::info!(%peer, peers = session.lobby.len(), "peer admitted");
        Ok(())
    }

    /// Removes `peer`: its player goes away and the host adopts everything
    /// it owned.
    ///
    /// # Errors
    ///
    /// [`crate::error::NetError`] if the destroy notice cannot be built.
    pub fn remove_peer(
        &mut self,
        peer: PeerId,
        session: &mut Session,
        sim: &mut dyn Simulation,
        transport: &mut dyn Transport,
        arena: &mut Arena,
    ) -> NetResult<()> {
        let mut io = Io {
            session,
            sim,
            transport,
            arena,
        };
        self.remove(peer, &mut io)
    }

    /// Sends `peer` a kick notice and removes it.
    ///
    /// # Errors
    ///
    /// [`crate::error::NetError`] if a notice cannot be built.
    pub fn kick(
        &mut self,
        peer: PeerId,
        reason: KickReason,
        session: &mut Session,
        sim: &mut dyn Simulation,
        transport: &mut dyn Transport,
        arena: &mut Arena,
    ) -> NetResult<()> {
        let mut io = Io {
            session,
            sim,
            transport,
            arena,
        };
        self.kick_peer(peer, reason, &mut io)
    }

    /// Switches every peer to `level`. Everything except players is removed.
    ///
    /// # Errors
    ///
    /// [`crate::error::NetError`] if the level name cannot be encoded.
    pub fn load_level(
        &mut self,
        level: &str,
        session: &mut Session,
        sim: &mut dyn Simulation,
        transport: &mut dyn Transport,
        arena: &mut Arena,
    ) -> NetResult<()> {
        let mut io = Io {
            session,
            sim,
            transport,
            arena,
        };
        io.sim.load_level(level);
        io.session.level = Some(level.to_owned());
        {
            let mut ctx = io.session.context(&mut *io.sim);
            io.session.registry.clear_level(&mut ctx);
        }
        tracing::info!(level, "level loaded");
        io.broadcast(&Packet::LoadLevel { level }, None)
    }

    fn greet(&mut self, io: &mut Io<'_>) -> NetResult<()> {
        let (major, minor, patch) = io.session.config.protocol_version;
        for peer in std::mem::take(&mut self.welcome) {
            let version = Packet::Version {
                sender: io.session.local,
                major,
                minor,
                patch,
            };
            io.send_to(peer, &version)?;
            if let Some(level) = io.session.level.clone() {
                io.send_to(peer, &Packet::LoadLevel { level: &level })?;
            }
        }
        Ok(())
    }

    fn receive(&mut self, peer: PeerId, kind: PacketType, bytes: &[u8], io: &mut Io<'_>) -> NetResult<()> {
        if !io.session.lobby.contains(peer) {
            tracing::debug!(%peer, ?kind, "message from unknown peer");
            self.stats.messages_dropped += 1;
            return Ok(());
        }
        match self.admin.on_traffic(peer, kind, bytes.len(), io.session.clock.now()) {
            Verdict::Allow => {}
            Verdict::Ban => return self.kick_peer(peer, KickReason::Banned, io),
            Verdict::Drop | Verdict::Warn => {
                self.stats.messages_dropped += 1;
                return Ok(());
            }
        }
        if bytes.len() > io.session.config.max_message_size {
            tracing::warn!(%peer, ?kind, len = bytes.len(), "oversized message");
            return self.violation(peer, Violation::Malformed(kind), io);
        }

        match kind.relay_class() {
            RelayClass::Snapshot => self.receive_snapshot(peer, bytes, io),
            RelayClass::Redirect => self.redirect(peer, kind, bytes, io),
            RelayClass::Apply => self.apply_directive(peer, kind, bytes, io),
            RelayClass::HostOnly => self.violation(peer, Violation::HostOnly(kind), io),
            RelayClass::Handshake => self.handshake(peer, bytes, io),
        }
    }

    fn receive_snapshot(&mut self, peer: PeerId, bytes: &[u8], io: &mut Io<'_>) -> NetResult<()> {
        let mut triples = std::mem::take(&mut self.triples);
        let result = self.admit_snapshot(peer, bytes, &mut triples, io);
        self.triples = triples;
        result
    }

    fn admit_snapshot(
        &mut self,
        peer: PeerId,
        bytes: &[u8],
        triples: &mut Vec<Triple>,
        io: &mut Io<'_>,
    ) -> NetResult<()> {
        if let Err(error) = snapshot::decode_into(bytes, triples) {
            tracing::warn!(%peer, %error, "malformed snapshot");
            return self.violation(peer, Violation::Malformed(PacketType::Snapshot), io);
        }

        for triple in triples.iter() {
            if let Some(violation) = check_triple(peer, triple, io.session) {
                return self.violation(peer, violation, io);
            }
        }

        // Objects never take a connected peer's player id.
        let before = triples.len();
        triples.retain(|t| t.ty == EntityType::Player || !io.session.lobby.contains(t.id.peer()));
        if triples.len() != before {
            tracing::debug!(%peer, dropped = before - triples.len(), "objects shadowing player ids dropped");
        }

        let now = io.session.clock.now();
        let mut created = 0;
        for triple in triples.iter() {
            if is_creation(triple, io.session) {
                match self.admin.on_entity_created(peer, triple.ty, now) {
                    Verdict::Allow => created += 1,
                    Verdict::Ban => return self.kick_peer(peer, KickReason::Banned, io),
                    Verdict::Drop | Verdict::Warn => {
                        self.stats.messages_dropped += 1;
                        return Ok(());
                    }
                }
            }
        }

        let mut ctx = io.session.context(&mut *io.sim);
        snapshot::apply(&mut io.session.registry, triples, &mut ctx);
        self.stats.entities_admitted += created;
        self.stats.messages_processed += 1;
        Ok(())
    }

    fn redirect(&mut self, peer: PeerId, kind: PacketType, bytes: &[u8], io: &mut Io<'_>) -> NetResult<()> {
        let packet = match Packet::decode(kind, bytes) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(%peer, ?kind, %error, "malformed directive");
                return self.violation(peer, Violation::Malformed(kind), io);
            }
        };
        let claimed = packet.sender().unwrap_or(PeerId::NONE);
        if claimed != peer {
            return self.violation(peer, Violation::Impersonation { claimed }, io);
        }
        if let Some(event) = NetEvent::from_packet(&packet) {
            self.events.push(event);
        }
        io.relay(kind, bytes, Some(peer));
        self.stats.messages_processed += 1;
        Ok(())
    }

    fn apply_directive(&mut self, peer: PeerId, kind: PacketType, bytes: &[u8], io: &mut Io<'_>) -> NetResult<()> {
        let packet = match Packet::decode(kind, bytes) {
            Ok(packet) => packet,
            Err(error) => {
                tracing::warn!(%peer, ?kind, %error, "malformed directive");
                return self.violation(peer, Violation::Malformed(kind), io);
            }
        };
        let claimed = packet.sender().unwrap_or(PeerId::NONE);
        if claimed != peer {
            return self.violation(peer, Violation::Impersonation { claimed }, io);
        }

        match packet {
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
                let Some(authority) = io.session.registry.find(target).map(|e| e.authority()) else {
                    return Ok(());
                };
                if authority != peer {
                    return self.violation(peer, Violation::NotAuthority(target), io);
                }
                let mut ctx = io.session.context(&mut *io.sim);
                io.session.registry.kill(target, true, &mut ctx);
            }
            _ => return Ok(()),
        }
        io.relay(kind, bytes, Some(peer));
        self.stats.messages_processed += 1;
        Ok(())
    }

    fn handshake(&mut self, peer: PeerId, bytes: &[u8], io: &mut Io<'_>) -> NetResult<()> {
        let Ok(Packet::Version {
            sender,
            major,
            minor,
            patch,
        }) = Packet::decode(PacketType::Version, bytes)
        else {
            return self.violation(peer, Violation::Malformed(PacketType::Version), io);
        };
        if sender != peer {
            return self.violation(peer, Violation::Impersonation { claimed: sender }, io);
        }
        let ours = io.session.config.protocol_version;
        if !compatible(ours, (major, minor, patch)) {
            tracing::warn!(%peer, ?ours, theirs = ?(major, minor, patch), "version mismatch");
            return self.kick_peer(peer, KickReason::VersionMismatch, io);
        }
        tracing::debug!(%peer, "version accepted");
        self.stats.messages_processed += 1;
        Ok(())
    }

    fn violation(&mut self, peer: PeerId, violation: Violation, io: &mut Io<'_>) -> NetResult<()> {
        self.stats.violations += 1;
        self.stats.messages_dropped += 1;
        tracing::warn!(%peer, ?violation, "message dropped");
        match self.admin.on_violation(peer, violation, io.session.clock.now()) {
            Verdict::Ban => self.kick_peer(peer, KickReason::Banned, io),
            Verdict::Allow | Verdict::Drop | Verdict::Warn => Ok(()),
        }
    }

    fn kick_peer(&mut self, peer: PeerId, reason: KickReason, io: &mut Io<'_>) -> NetResult<()> {
        if !io.session.lobby.contains(peer) || peer == io.session.local {
            return Ok(());
        }
        if reason == KickReason::Banned {
            tracing::error!(%peer, "peer banned");
            self.admin.ban(peer);
        } else {
            tracing::warn!(%peer, ?reason, "peer kicked");
        }
        io.send_to(peer, &Packet::Kick { reason })?;
        io.transport.close(peer);
        self.stats.kicks += 1;
        self.remove(peer, io)
    }

    fn remove(&mut self, peer: PeerId, io: &mut Io<'_>) -> NetResult<()> {
        if !io.session.lobby.leave(peer) {
            return Ok(());
        }
        self.welcome.retain(|p| *p != peer);
        self.admin.on_leave(peer);

        let player = peer.entity();
        let local = io.session.local;
        let (adopted, removed) = {
            let mut ctx = io.session.context(&mut *io.sim);
            let adopted = io.session.registry.reassign(peer, local, &mut ctx);
            (adopted, io.session.registry.destroy(player, &mut ctx))
        };
        tracing::info!(%peer, adopted, "peer left");
        if removed {
            io.broadcast(&Packet::DestroyEntity { target: player }, None)?;
        }
        Ok(())
    }
}

/// First rule a snapshot triple from `peer` breaks, if any.
fn check_triple(peer: PeerId, triple: &Triple, session: &Session) -> Option<Violation> {
    if triple.ty == EntityType::Player {
        if triple.id != peer.entity() {
            return Some(Violation::Impersonation {
                claimed: triple.id.peer(),
            });
        }
    } else if triple.claimed_owner() != peer {
        return Some(Violation::Impersonation {
            claimed: triple.claimed_owner(),
        });
    }
    if is_creation(triple, session)
        && !session
            .policy
            .may_create(peer, session.lobby.host(), triple.id, triple.ty)
    {
        return Some(Violation::ForbiddenSpawn(triple.ty));
    }
    None
}

/// Whether applying `triple` would create an entity. Tombstoned ids are
/// ignored by the registry, except a player coming back.
fn is_creation(triple: &Triple, session: &Session) -> bool {
    if session.registry.contains(triple.id) {
        return false;
    }
    triple.ty == EntityType::Player || !session.registry.is_tombstoned(triple.id)
}

impl Endpoint for Server {
    fn tick(
        &mut self,
        session: &mut Session,
        sim: &mut dyn Simulation,
        transport: &mut dyn Transport,
        arena: &mut Arena,
    ) -> NetResult<()> {
        arena.reset();
        let mut io = Io {
            session,
            sim,
            transport,
            arena,
        };
        self.greet(&mut io)?;

        for kind in PacketType::ALL {
            while let Some((peer, bytes)) = io.transport.recv(kind) {
                self.receive(peer, kind, &bytes, &mut io)?;
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
            io.broadcast(&Packet::KillEntity { sender: local, target }, None)?;
        }
        self.reported = reported;

        if io.session.lobby.len() > 1 {
            let ctx = io.session.context(&mut *io.sim);
            let bytes = snapshot::encode(&io.session.registry, SnapshotScope::All, &ctx, &mut *io.arena)?;
            super::relay_to(io.session, &mut *io.transport, PacketType::Snapshot, bytes, None);
            self.stats.snapshots_sent += 1;
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
        let bytes = super::encode_packet(packet, arena)?;
        super::relay_to(session, transport, packet.kind(), bytes, None);
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<NetEvent> {
        std::mem::take(&mut self.events)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("welcome", &self.welcome)
            .field("events", &self.events.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
