//! # Endpoints
//!
//! The per-tick driver on each machine. The host runs a [`Server`], everyone
//! else a [`Client`]. Both follow the same tick:
//!
//! ```text
//! arena.reset()
//!   │
//!   ├─ drain every packet type ── validate ── apply / relay
//!   ├─ registry.update_all()      interpolate into the simulation
//!   ├─ registry.sweep()           report our own deaths as KillEntity
//!   ├─ build snapshot             into the arena, send unreliably
//!   └─ session.advance()
//! ```
//!
//! Everything inbound is handled before the outbound snapshot is built, so an
//! ownership change that arrived this tick is already in this tick's output.
//!
//! Directives the core does not act on itself (effects, votes, sprays) are
//! queued as [`NetEvent`]s for the game to drain.

mod client;
mod server;

pub use client::{Client, ClientState};
pub use server::{Server, ServerStats};

use crate::error::NetResult;
use crate::protocol::{Packet, PunchKind, Writer};
use crate::session::Session;
use crate::simulation::Simulation;
use crate::transport::Transport;
use tether_core::Arena;
use tether_shared::{Color, EntityType, KickReason, PacketType, PeerId, Vec3};

/// Something the game should react to.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum NetEvent {
    SpawnBullet {
        sender: PeerId,
        weapon: u8,
        origin: Vec3,
        direction: Vec3,
    },
    SpawnHitscan {
        sender: PeerId,
        beam: EntityType,
        origin: Vec3,
        end: Vec3,
    },
    SpawnCannon {
        sender: PeerId,
        origin: Vec3,
        velocity: Vec3,
    },
    Punch {
        sender: PeerId,
        kind: PunchKind,
        position: Vec3,
    },
    Point {
        sender: PeerId,
        position: Vec3,
        normal: Vec3,
    },
    Spray {
        sender: PeerId,
        position: Vec3,
        normal: Vec3,
        tint: Color,
    },
    Style {
        sender: PeerId,
        body: Color,
        preset: u8,
    },
    Vote {
        sender: PeerId,
        option: u8,
    },
    ImageChunk {
        sender: PeerId,
        index: u16,
        data: Vec<u8>,
    },
    RequestImage {
        sender: PeerId,
        owner: PeerId,
    },
    ActivateObject {
        index: u32,
        active: bool,
    },
    CinemaAction {
        action: String,
    },
    /// This machine left the session.
    Disconnected {
        reason: KickReason,
    },
}

impl NetEvent {
    /// Owned copy of a directive the game handles. `None` for directives the
    /// core acts on itself.
    #[must_use]
    pub fn from_packet(packet: &Packet<'_>) -> Option<Self> {
        Some(match *packet {
            Packet::SpawnBullet {
                sender,
                weapon,
                origin,
                direction,
            } => Self::SpawnBullet {
                sender,
                weapon,
                origin,
                direction,
            },
            Packet::SpawnHitscan {
                sender,
                beam,
                origin,
                end,
            } => Self::SpawnHitscan {
                sender,
                beam,
                origin,
                end,
            },
            Packet::SpawnCannon {
                sender,
                origin,
                velocity,
            } => Self::SpawnCannon {
                sender,
                origin,
                velocity,
            },
            Packet::Punch {
                sender,
                kind,
                position,
            } => Self::Punch {
                sender,
                kind,
                position,
            },
            Packet::Point {
                sender,
                position,
                normal,
            } => Self::Point {
                sender,
                position,
                normal,
            },
            Packet::Spray {
                sender,
                position,
                normal,
                tint,
            } => Self::Spray {
                sender,
                position,
                normal,
                tint,
            },
            Packet::Style {
                sender,
                body,
                preset,
            } => Self::Style {
                sender,
                body,
                preset,
            },
            Packet::Vote { sender, option } => Self::Vote { sender, option },
            Packet::ImageChunk {
                sender,
                index,
                data,
            } => Self::ImageChunk {
                sender,
                index,
                data: data.to_vec(),
            },
            Packet::RequestImage { sender, owner } => Self::RequestImage { sender, owner },
            Packet::ActivateObject { index, active } => Self::ActivateObject { index, active },
            Packet::CinemaAction { action } => Self::CinemaAction {
                action: action.to_owned(),
            },
            Packet::LoadLevel { .. }
            | Packet::Kick { .. }
            | Packet::DamageEntity { .. }
            | Packet::KillEntity { .. }
            | Packet::Version { .. }
            | Packet::DestroyEntity { .. } => return None,
        })
    }
}

/// A role in the session.
pub trait Endpoint {
    /// Runs one fixed-step tick.
    ///
    /// # Errors
    ///
    /// [`crate::error::NetError`] when an outgoing message cannot be built.
    /// Bad inbound messages are dropped and never surface here.
    fn tick(
        &mut self,
        session: &mut Session,
        sim: &mut dyn Simulation,
        transport: &mut dyn Transport,
        arena: &mut Arena,
    ) -> NetResult<()>;

    /// Sends a directive originating on this machine: the host broadcasts
    /// it, a client sends it to the host for relaying.
    ///
    /// # Errors
    ///
    /// [`crate::error::NetError`] when the message cannot be built.
    fn send(
        &mut self,
        session: &Session,
        transport: &mut dyn Transport,
        arena: &mut Arena,
        packet: &Packet<'_>,
    ) -> NetResult<()>;

    /// Takes every queued [`NetEvent`].
    fn drain_events(&mut self) -> Vec<NetEvent>;
}

/// Versions talk to each other when major and minor agree.
#[inline]
#[must_use]
pub const fn compatible(ours: (u8, u8, u8), theirs: (u8, u8, u8)) -> bool {
    ours.0 == theirs.0 && ours.1 == theirs.1
}

/// Writes `packet` into a buffer from `arena`.
pub(crate) fn encode_packet<'a>(packet: &Packet<'_>, arena: &'a mut Arena) -> NetResult<&'a [u8]> {
    let buffer = arena.alloc(packet.encoded_len())?;
    packet.write(&mut Writer::new(&mut *buffer))?;
    let buffer: &'a [u8] = buffer;
    Ok(buffer)
}

/// Hands `bytes` to the transport. A refused send only concerns that one
/// peer and is logged.
pub(crate) fn deliver(transport: &mut dyn Transport, to: PeerId, kind: PacketType, bytes: &[u8]) {
    if let Err(error) = transport.send(to, kind, bytes, kind.reliability()) {
        tracing::debug!(%to, ?kind, %error, "send refused");
    }
}

/// The collaborators an endpoint works against during one call.
pub(crate) struct Io<'a> {
    pub session: &'a mut Session,
    pub sim: &'a mut dyn Simulation,
    pub transport: &'a mut dyn Transport,
    pub arena: &'a mut Arena,
}

impl Io<'_> {
    /// Encodes and sends to one peer.
    pub fn send_to(&mut self, to: PeerId, packet: &Packet<'_>) -> NetResult<()> {
        let bytes = encode_packet(packet, &mut *self.arena)?;
        deliver(&mut *self.transport, to, packet.kind(), bytes);
        Ok(())
    }

    /// Encodes and sends to every other peer except `except`.
    pub fn broadcast(&mut self, packet: &Packet<'_>, except: Option<PeerId>) -> NetResult<()> {
        let bytes = encode_packet(packet, &mut *self.arena)?;
        relay_to(self.session, &mut *self.transport, packet.kind(), bytes, except);
        Ok(())
    }

    /// Forwards received bytes verbatim to every other peer except `except`.
    pub fn relay(&mut self, kind: PacketType, bytes: &[u8], except: Option<PeerId>) {
        relay_to(self.session, &mut *self.transport, kind, bytes, except);
    }
}

fn relay_to(
    session: &Session,
    transport: &mut dyn Transport,
    kind: PacketType,
    bytes: &[u8],
    except: Option<PeerId>,
) {
    let local = session.local();
    for peer in session.lobby().peers() {
        if peer != local && Some(peer) != except {
            deliver(transport, peer, kind, bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_compatibility() {
        assert!(compatible((1, 2, 0), (1, 2, 7)));
        assert!(!compatible((1, 2, 0), (1, 3, 0)));
        assert!(!compatible((1, 2, 0), (2, 2, 0)));
    }

    #[test]
    fn test_events_only_for_game_directives() {
        let vote = Packet::Vote {
            sender: PeerId(3),
            option: 1,
        };
        assert_eq!(
            NetEvent::from_packet(&vote),
            Some(NetEvent::Vote {
                sender: PeerId(3),
                option: 1
            })
        );
        let chunk = Packet::ImageChunk {
            sender: PeerId(3),
            index: 0,
            data: &[7, 8],
        };
        assert!(matches!(
            NetEvent::from_packet(&chunk),
            Some(NetEvent::ImageChunk { data, .. }) if data == vec![7, 8]
        ));
        let kick = Packet::Kick {
            reason: KickReason::Kicked,
        };
        assert_eq!(NetEvent::from_packet(&kick), None);
    }

    #[test]
    fn test_encode_packet_uses_arena() {
        let mut arena = Arena::new(64);
        let packet = Packet::DestroyEntity {
            target: tether_shared::EntityId(9),
        };
        let bytes = encode_packet(&packet, &mut arena).unwrap();
        assert_eq!(bytes, &9u64.to_le_bytes());
        assert_eq!(arena.used(), 8);
    }
}
