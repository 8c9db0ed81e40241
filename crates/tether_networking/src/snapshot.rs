//! # Snapshot Messages
//!
//! A snapshot is a bare run of triples until the message ends:
//!
//! ```text
//! ┌──────────┬─────────┬───────────────────┬──────────┬─────────┬─────
//! │ id (u64) │ type u8 │ payload (by type) │ id (u64) │ type u8 │ ...
//! └──────────┴─────────┴───────────────────┴──────────┴─────────┴─────
//! ```
//!
//! No count, no lengths: the type is the only way to know where a payload
//! ends. Decoding therefore runs in two phases. Every triple is decoded into
//! a scratch list first, and only a message that decodes completely is
//! applied, so a malformed tail never leaves half a message applied.
//!
//! Outgoing snapshots are written into the tick's arena and are gone at the
//! next `reset`.

use crate::entity::{Entity, EntityContext, EntityPayload, TRIPLE_HEADER_SIZE};
use crate::error::{CodecError, CodecResult, NetResult};
use crate::protocol::{Reader, Writer};
use crate::registry::EntityRegistry;
use tether_core::Arena;
use tether_shared::{EntityId, EntityType, PeerId};

/// One decoded `(id, type, payload)` entry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triple {
    /// Entity id.
    pub id: EntityId,
    /// Entity type.
    pub ty: EntityType,
    /// Decoded payload.
    pub payload: EntityPayload,
}

impl Triple {
    /// Owner the payload claims. Players are owned by themselves.
    #[must_use]
    pub fn claimed_owner(&self) -> PeerId {
        self.payload.owner().unwrap_or_else(|| self.id.peer())
    }
}

/// Which entities a snapshot carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Every live entity. Used by the host.
    All,
    /// Live entities this peer is the authority for. Used by clients.
    OwnedBy(PeerId),
}

/// Encodes the entities in `scope` into a buffer taken from `arena`.
///
/// # Errors
///
/// [`crate::error::NetError::Memory`] when the arena cannot hold the
/// snapshot, [`crate::error::NetError::Codec`] if a payload outgrows its
/// declared maximum.
pub fn encode<'a>(
    registry: &EntityRegistry,
    scope: SnapshotScope,
    ctx: &EntityContext<'_>,
    arena: &'a mut Arena,
) -> NetResult<&'a [u8]> {
    let in_scope = |e: &&(dyn Entity + 'static)| match scope {
        SnapshotScope::All => true,
        SnapshotScope::OwnedBy(peer) => e.authority() == peer,
    };
    let size = registry
        .alive()
        .filter(in_scope)
        .map(|e| TRIPLE_HEADER_SIZE + EntityPayload::max_size(e.ty()))
        .sum();

    let buffer = arena.alloc(size)?;
    let mut w = Writer::new(&mut *buffer);
    for entity in registry.alive().filter(in_scope) {
        w.write_entity(entity.id())?;
        w.write_u8(entity.ty().to_u8())?;
        entity.write(&mut w, ctx)?;
    }
    let len = w.len();
    let buffer: &'a [u8] = buffer;
    Ok(&buffer[..len])
}

/// Decodes a whole snapshot into `out`, replacing its contents. On error
/// `out` is left empty.
///
/// # Errors
///
/// Any read-side [`CodecError`], including [`CodecError::UnknownEntityType`]
/// and [`CodecError::NotReplicated`] for bad type tags.
pub fn decode_into(bytes: &[u8], out: &mut Vec<Triple>) -> CodecResult<()> {
    out.clear();
    let mut r = Reader::new(bytes);
    while !r.is_exhausted() {
        match read_triple(&mut r) {
            Ok(triple) => out.push(triple),
            Err(e) => {
                out.clear();
                return Err(e);
            }
        }
    }
    Ok(())
}

fn read_triple(r: &mut Reader<'_>) -> CodecResult<Triple> {
    let id = r.read_entity()?;
    let tag = r.read_u8()?;
    let ty = EntityType::from_u8(tag).ok_or(CodecError::UnknownEntityType(tag))?;
    let payload = EntityPayload::read(ty, r)?;
    Ok(Triple { id, ty, payload })
}

/// Routes decoded triples into the registry, creating entities on first
/// sight. Returns how many were applied.
pub fn apply(registry: &mut EntityRegistry, triples: &[Triple], ctx: &mut EntityContext<'_>) -> usize {
    let mut applied = 0;
    for triple in triples {
        if let Some(entity) = registry.get(triple.id, triple.ty, triple.claimed_owner(), ctx) {
            entity.apply(&triple.payload, ctx);
            applied += 1;
        }
    }
    applied
}
