//! # LAN Session
//!
//! A host and any number of clients in one process, each with its own
//! [`MockSimulation`] and tick arena, connected through one [`LoopbackHub`].
//!
//! Every [`LanSession::tick`] steps the host first and then each client in
//! join order, so one tick carries a message at most one hop.

use std::collections::BTreeSet;
use std::fmt;

use tether_core::Arena;
use tether_networking::{
    Client, ClientState, Endpoint, LoopbackHub, LoopbackTransport, MockSimulation, NetResult, NetworkConfig,
    Packet, Server, Session, TransportStats,
};
use tether_security::Moderator;
use tether_shared::{EntityCategory, EntityId, EntityType, PeerId, Vec3};

use crate::config::TetherConfig;
use crate::error::TetherError;

/// Peer id of the host.
pub const HOST: PeerId = PeerId(1);

/// One machine: its role, its view of the session and its own resources.
#[derive(Debug)]
pub struct LanNode<E> {
    /// Server or client role.
    pub endpoint: E,
    /// This machine's view.
    pub session: Session,
    /// This machine's game.
    pub sim: MockSimulation,
    /// This machine's end of the hub.
    pub transport: LoopbackTransport,
    /// Per-tick scratch memory.
    pub arena: Arena,
}

impl<E: Endpoint> LanNode<E> {
    fn new(endpoint: E, session: Session, transport: LoopbackTransport) -> Self {
        let arena = Arena::new(session.config().arena_capacity);
        Self {
            endpoint,
            session,
            sim: MockSimulation::new(),
            transport,
            arena,
        }
    }

    /// Runs one endpoint tick.
    ///
    /// # Errors
    ///
    /// Whatever [`Endpoint::tick`] reports.
    pub fn tick(&mut self) -> NetResult<()> {
        self.endpoint
            .tick(&mut self.session, &mut self.sim, &mut self.transport, &mut self.arena)
    }

    /// Spawns a locally owned entity.
    pub fn spawn(&mut self, ty: EntityType, position: Vec3) -> Option<EntityId> {
        self.session.spawn(ty, position, &mut self.sim)
    }

    /// Sends a directive through the endpoint.
    ///
    /// # Errors
    ///
    /// Whatever [`Endpoint::send`] reports.
    pub fn send(&mut self, packet: &Packet<'_>) -> NetResult<()> {
        self.endpoint
            .send(&self.session, &mut self.transport, &mut self.arena, packet)
    }

    /// Ids of every live entity this machine knows.
    #[must_use]
    pub fn live_ids(&self) -> BTreeSet<EntityId> {
        self.session.registry().alive().map(|e| e.id()).collect()
    }

    /// Entity counts as this machine sees them.
    #[must_use]
    pub fn summary(&self) -> PeerSummary {
        let registry = self.session.registry();
        let local = self.session.local();
        PeerSummary {
            peer: local,
            host: self.session.is_host(),
            players: registry.count(EntityCategory::Player),
            enemies: registry.count(EntityCategory::Enemy),
            items: registry.count(EntityCategory::Item),
            coins: registry.count(EntityCategory::Coin),
            projectiles: registry.count(EntityCategory::Projectile),
            owned: registry.owned_by(local).count(),
        }
    }
}

/// Entity counts of one peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PeerSummary {
    pub peer: PeerId,
    pub host: bool,
    pub players: usize,
    pub enemies: usize,
    pub items: usize,
    pub coins: usize,
    pub projectiles: usize,
    pub owned: usize,
}

impl PeerSummary {
    /// Live entities of every kind.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.players + self.enemies + self.items + self.coins + self.projectiles
    }
}

impl fmt::Display for PeerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.host { "host" } else { "client" };
        write!(
            f,
            "{:<8} {:<6} players {:>2}  enemies {:>3}  items {:>3}  coins {:>3}  projectiles {:>3}  owned {:>3}",
            self.peer.to_string(),
            role,
            self.players,
            self.enemies,
            self.items,
            self.coins,
            self.projectiles,
            self.owned
        )
    }
}

/// A host and its clients over one loopback hub.
#[derive(Debug)]
pub struct LanSession {
    hub: LoopbackHub,
    network: NetworkConfig,
    host: LanNode<Server>,
    clients: Vec<LanNode<Client>>,
    next_peer: u64,
}

impl LanSession {
    /// Builds the host, loads the configured level and joins the configured
    /// number of clients.
    ///
    /// # Errors
    ///
    /// [`TetherError`] if the host refuses a client or the level cannot be
    /// announced.
    pub fn new(config: &TetherConfig) -> Result<Self, TetherError> {
        let hub = LoopbackHub::new(config.lan.conditions, config.lan.seed);
        let server = if config.lan.moderated {
            Server::new(Box::new(Moderator::new(config.moderation.clone())))
        } else {
            Server::permissive()
        };
        let host = LanNode::new(
            server,
            Session::host(HOST, config.network.clone()),
            hub.connect(HOST),
        );

        let mut lan = Self {
            hub,
            network: config.network.clone(),
            host,
            clients: Vec::new(),
            next_peer: HOST.0 + 1,
        };
        if let Some(level) = &config.lan.level {
            lan.load_level(level)?;
        }
        for _ in 0..config.lan.clients {
            lan.join()?;
        }
        tracing::info!(clients = lan.clients.len(), "lan session ready");
        Ok(lan)
    }

    /// Admits a new client with the session's network settings.
    ///
    /// # Errors
    ///
    /// [`TetherError::Admission`] if the host refuses it.
    pub fn join(&mut self) -> Result<PeerId, TetherError> {
        let network = self.network.clone();
        self.join_with(network)
    }

    /// Admits a new client with its own network settings, for example a
    /// different protocol version.
    ///
    /// # Errors
    ///
    /// [`TetherError::Admission`] if the host refuses it.
    pub fn join_with(&mut self, network: NetworkConfig) -> Result<PeerId, TetherError> {
        let peer = PeerId(self.next_peer);
        self.host.endpoint.admit(peer, &mut self.host.session)?;
        self.next_peer += 1;

        let members: Vec<PeerId> = self
            .host
            .session
            .lobby()
            .peers()
            .filter(|p| *p != HOST && *p != peer)
            .collect();
        self.clients.push(LanNode::new(
            Client::new(),
            Session::join(peer, HOST, &members, network),
            self.hub.connect(peer),
        ));
        Ok(peer)
    }

    /// Removes `peer` from the host and drops its machine. Returns whether
    /// it was present.
    ///
    /// # Errors
    ///
    /// [`TetherError::Net`] if the host cannot announce the departure.
    pub fn remove(&mut self, peer: PeerId) -> Result<bool, TetherError> {
        let Some(index) = self.clients.iter().position(|c| c.session.local() == peer) else {
            return Ok(false);
        };
        let host = &mut self.host;
        host.endpoint.remove_peer(
            peer,
            &mut host.session,
            &mut host.sim,
            &mut host.transport,
            &mut host.arena,
        )?;
        self.hub.disconnect(peer);
        self.clients.remove(index);
        Ok(true)
    }

    /// Moves everyone to `level`.
    ///
    /// # Errors
    ///
    /// [`TetherError::Net`] if the level cannot be announced.
    pub fn load_level(&mut self, level: &str) -> Result<(), TetherError> {
        let host = &mut self.host;
        host.endpoint.load_level(
            level,
            &mut host.session,
            &mut host.sim,
            &mut host.transport,
            &mut host.arena,
        )?;
        Ok(())
    }

    /// Steps the host, then every client.
    ///
    /// # Errors
    ///
    /// The first endpoint failure.
    pub fn tick(&mut self) -> Result<(), TetherError> {
        self.host.tick()?;
        for client in &mut self.clients {
            client.tick()?;
        }
        Ok(())
    }

    /// Runs `ticks` ticks.
    ///
    /// # Errors
    ///
    /// The first endpoint failure.
    pub fn run(&mut self, ticks: u64) -> Result<(), TetherError> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// The host machine.
    #[must_use]
    pub const fn host(&self) -> &LanNode<Server> {
        &self.host
    }

    /// The host machine, mutable.
    pub fn host_mut(&mut self) -> &mut LanNode<Server> {
        &mut self.host
    }

    /// Client machines in join order.
    #[must_use]
    pub fn clients(&self) -> &[LanNode<Client>] {
        &self.clients
    }

    /// Client machines, mutable.
    pub fn clients_mut(&mut self) -> &mut [LanNode<Client>] {
        &mut self.clients
    }

    /// The client machine of `peer`.
    pub fn client_mut(&mut self, peer: PeerId) -> Option<&mut LanNode<Client>> {
        self.clients.iter_mut().find(|c| c.session.local() == peer)
    }

    /// Loopback counters.
    #[must_use]
    pub fn transport_stats(&self) -> TransportStats {
        self.hub.stats()
    }

    /// Whether every connected client sees exactly the host's live entities.
    #[must_use]
    pub fn converged(&self) -> bool {
        let expected = self.host.live_ids();
        self.clients
            .iter()
            .filter(|c| c.endpoint.state() == ClientState::Connected)
            .all(|c| c.live_ids() == expected)
    }

    /// Host first, then every client.
    #[must_use]
    pub fn summaries(&self) -> Vec<PeerSummary> {
        std::iter::once(self.host.summary())
            .chain(self.clients.iter().map(LanNode::summary))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(clients: usize) -> TetherConfig {
        let mut config = TetherConfig::default();
        config.lan.clients = clients;
        config
    }

    #[test]
    fn test_new_joins_configured_clients() {
        let lan = LanSession::new(&quiet(3)).unwrap();
        assert_eq!(lan.clients().len(), 3);
        assert_eq!(lan.host().session.lobby().len(), 4);
        let peers: Vec<PeerId> = lan.clients().iter().map(|c| c.session.local()).collect();
        assert_eq!(peers, vec![PeerId(2), PeerId(3), PeerId(4)]);
    }

    #[test]
    fn test_players_converge() {
        let mut lan = LanSession::new(&quiet(2)).unwrap();
        lan.run(4).unwrap();
        assert!(lan.converged());
        for summary in lan.summaries() {
            assert_eq!(summary.players, 3, "{summary}");
            assert_eq!(summary.owned, 1);
        }
    }

    #[test]
    fn test_remove_unknown_peer_is_noop() {
        let mut lan = LanSession::new(&quiet(1)).unwrap();
        assert!(!lan.remove(PeerId(40)).unwrap());
        assert!(lan.remove(PeerId(2)).unwrap());
        assert!(lan.clients().is_empty());
        assert_eq!(lan.host().session.lobby().len(), 1);
    }

    #[test]
    fn test_summary_display() {
        let summary = PeerSummary {
            peer: HOST,
            host: true,
            players: 2,
            enemies: 0,
            items: 1,
            coins: 3,
            projectiles: 0,
            owned: 4,
        };
        let line = summary.to_string();
        assert!(line.contains("host"));
        assert!(line.contains("coins   3"));
        assert_eq!(summary.total(), 6);
    }
}
