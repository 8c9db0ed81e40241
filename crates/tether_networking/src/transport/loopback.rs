//! In-process transport.
//!
//! ```text
//!            LoopbackHub (Arc<Mutex<HubState>>)
//!          ┌──────────────────────────────────┐
//!  send ──>│ routes: peer -> Sender<Envelope>  │──> peer's inbox
//!          │ closed pairs, conditions, rng    │
//!          └──────────────────────────────────┘
//! ```
//!
//! Each [`LoopbackTransport`] drains its inbox into one queue per packet type
//! on `recv`, so channels can be polled in any order.
//!
//! Closing a connection refuses new sends in both directions. Messages the
//! closing side already sent are still delivered, which is how a kick
//! notice reaches the kicked peer.

use super::{NetworkConditions, Transport, TransportStats};
use crate::error::TransportError;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tether_shared::{PacketType, PeerId, Reliability};

struct Envelope {
    from: PeerId,
    kind: PacketType,
    bytes: Vec<u8>,
}

struct HubState {
    routes: HashMap<PeerId, Sender<Envelope>>,
    closed: HashSet<(PeerId, PeerId)>,
    conditions: NetworkConditions,
    rng: StdRng,
    stats: TransportStats,
}

const fn pair(a: PeerId, b: PeerId) -> (PeerId, PeerId) {
    if a.0 < b.0 {
        (a, b)
    } else {
        (b, a)
    }
}

/// Shared switchboard connecting loopback transports.
#[derive(Clone)]
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    /// Hub applying `conditions`, with a seeded fault generator so runs are
    /// reproducible.
    #[must_use]
    pub fn new(conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState {
                routes: HashMap::new(),
                closed: HashSet::new(),
                conditions,
                rng: StdRng::seed_from_u64(seed),
                stats: TransportStats::default(),
            })),
        }
    }

    /// Attaches `peer` and returns its end. Reconnecting clears any closed
    /// pairs involving it.
    #[must_use]
    pub fn connect(&self, peer: PeerId) -> LoopbackTransport {
        let (sender, inbox) = unbounded();
        {
            let mut state = self.state.lock();
            state.routes.insert(peer, sender);
            state.closed.retain(|(a, b)| *a != peer && *b != peer);
        }
        tracing::debug!(%peer, "loopback connected");
        LoopbackTransport {
            local: peer,
            hub: self.clone(),
            inbox,
            pending: std::array::from_fn(|_| VecDeque::new()),
            closed: HashSet::new(),
        }
    }

    /// Detaches `peer`. Messages to it are refused from now on.
    pub fn disconnect(&self, peer: PeerId) {
        self.state.lock().routes.remove(&peer);
    }

    /// Replaces the fault model.
    pub fn set_conditions(&self, conditions: NetworkConditions) {
        self.state.lock().conditions = conditions;
    }

    /// Hub-wide counters.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        self.state.lock().stats
    }

    fn deliver(
        &self,
        from: PeerId,
        to: PeerId,
        kind: PacketType,
        bytes: &[u8],
        reliability: Reliability,
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.closed.contains(&pair(from, to)) {
            return Err(TransportError::Closed(to));
        }
        let Some(route) = state.routes.get(&to).cloned() else {
            return Err(TransportError::UnknownPeer(to));
        };

        state.stats.packets_sent += 1;
        state.stats.bytes_sent += bytes.len() as u64;

        let mut copies = 1;
        if reliability == Reliability::Unreliable {
            let conditions = state.conditions;
            if conditions.should_drop(&mut state.rng) {
                state.stats.packets_dropped += 1;
                return Ok(());
            }
            if conditions.should_duplicate(&mut state.rng) {
                state.stats.packets_duplicated += 1;
                copies = 2;
            }
        }
        drop(state);

        for _ in 0..copies {
            let envelope = Envelope {
                from,
                kind,
                bytes: bytes.to_vec(),
            };
            if route.send(envelope).is_err() {
                return Err(TransportError::Closed(to));
            }
        }
        Ok(())
    }

    fn close(&self, a: PeerId, b: PeerId) {
        self.state.lock().closed.insert(pair(a, b));
    }

    fn count_received(&self, bytes: usize) {
        let mut state = self.state.lock();
        state.stats.packets_received += 1;
        state.stats.bytes_received += bytes as u64;
    }
}

impl std::fmt::Debug for LoopbackHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("LoopbackHub")
            .field("peers", &state.routes.len())
            .field("conditions", &state.conditions)
            .field("stats", &state.stats)
            .finish()
    }
}

/// One peer's end of a [`LoopbackHub`].
pub struct LoopbackTransport {
    local: PeerId,
    hub: LoopbackHub,
    inbox: Receiver<Envelope>,
    pending: [VecDeque<(PeerId, Vec<u8>)>; PacketType::COUNT],
    closed: HashSet<PeerId>,
}

impl LoopbackTransport {
    fn pump(&mut self) {
        while let Ok(envelope) = self.inbox.try_recv() {
            if self.closed.contains(&envelope.from) {
                continue;
            }
            self.hub.count_received(envelope.bytes.len());
            self.pending[usize::from(envelope.kind.to_u8())].push_back((envelope.from, envelope.bytes));
        }
    }

    /// Messages waiting across all channels.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.inbox.len() + self.pending.iter().map(VecDeque::len).sum::<usize>()
    }
}

impl Transport for LoopbackTransport {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn send(
        &mut self,
        to: PeerId,
        kind: PacketType,
        bytes: &[u8],
        reliability: Reliability,
    ) -> Result<(), TransportError> {
        self.hub.deliver(self.local, to, kind, bytes, reliability)
    }

    fn recv(&mut self, kind: PacketType) -> Option<(PeerId, Vec<u8>)> {
        self.pump();
        self.pending[usize::from(kind.to_u8())].pop_front()
    }

    fn close(&mut self, peer: PeerId) {
        tracing::debug!(local = %self.local, %peer, "loopback closed");
        self.hub.close(self.local, peer);
        self.closed.insert(peer);
        for queue in &mut self.pending {
            queue.retain(|(from, _)| *from != peer);
        }
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("local", &self.local)
            .field("backlog", &self.backlog())
            .finish_non_exhaustive()
    }
}
