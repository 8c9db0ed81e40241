//! Loopback harness shared by the scenario tests.

#![allow(dead_code)]

use tether_core::Arena;
use tether_networking::{
    Client, Endpoint, Entity, LoopbackHub, LoopbackTransport, MockSimulation, NetworkConditions, NetworkConfig,
    OwnableEntity, Server, Session,
};
use tether_shared::{EntityId, PeerId};

pub const HOST: PeerId = PeerId(1);

pub struct Host {
    pub server: Server,
    pub session: Session,
    pub sim: MockSimulation,
    pub transport: LoopbackTransport,
    pub arena: Arena,
}

impl Host {
    pub fn tick(&mut self) {
        self.server
            .tick(&mut self.session, &mut self.sim, &mut self.transport, &mut self.arena)
            .unwrap();
    }
}

pub struct Peer {
    pub client: Client,
    pub session: Session,
    pub sim: MockSimulation,
    pub transport: LoopbackTransport,
    pub arena: Arena,
}

impl Peer {
    pub fn tick(&mut self) {
        self.client
            .tick(&mut self.session, &mut self.sim, &mut self.transport, &mut self.arena)
            .unwrap();
    }

    pub fn local(&self) -> PeerId {
        self.session.local()
    }
}

pub struct Net {
    pub hub: LoopbackHub,
    pub config: NetworkConfig,
    pub host: Host,
    pub peers: Vec<Peer>,
}

impl Net {
    pub fn new(conditions: NetworkConditions) -> Self {
        Self::with_server(conditions, NetworkConfig::default(), Server::permissive())
    }

    pub fn with_server(conditions: NetworkConditions, config: NetworkConfig, server: Server) -> Self {
        let hub = LoopbackHub::new(conditions, 42);
        let host = Host {
            server,
            session: Session::host(HOST, config.clone()),
            sim: MockSimulation::new(),
            transport: hub.connect(HOST),
            arena: Arena::new(config.arena_capacity),
        };
        Self {
            hub,
            config,
            host,
            peers: Vec::new(),
        }
    }

    /// Admits `peer` on the host and builds its client. Returns its index.
    pub fn join(&mut self, peer: PeerId) -> usize {
        self.join_with(peer, self.config.clone())
    }

    pub fn join_with(&mut self, peer: PeerId, config: NetworkConfig) -> usize {
        self.host.server.admit(peer, &mut self.host.session).unwrap();
        let members: Vec<PeerId> = self
            .host
            .session
            .lobby()
            .peers()
            .filter(|p| *p != HOST && *p != peer)
            .collect();
        self.peers.push(Peer {
            client: Client::new(),
            session: Session::join(peer, HOST, &members, config.clone()),
            sim: MockSimulation::new(),
            transport: self.hub.connect(peer),
            arena: Arena::new(config.arena_capacity),
        });
        self.peers.len() - 1
    }

    /// Removes `peer` on the host. Its client stays in `peers`.
    pub fn remove(&mut self, peer: PeerId) {
        self.host
            .server
            .remove_peer(
                peer,
                &mut self.host.session,
                &mut self.host.sim,
                &mut self.host.transport,
                &mut self.host.arena,
            )
            .unwrap();
    }

    /// Host first, then every client.
    pub fn tick(&mut self) {
        self.host.tick();
        for peer in &mut self.peers {
            peer.tick();
        }
    }

    pub fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.tick();
        }
    }
}

/// Owner of `id` as `session` sees it.
pub fn owner_of(session: &Session, id: EntityId) -> Option<PeerId> {
    session
        .registry()
        .find(id)
        .and_then(|e| e.as_ownable())
        .map(|o| o.owner())
}
