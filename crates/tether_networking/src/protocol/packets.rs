//! # Directive Packets
//!
//! Every message that is not a snapshot. Each variant's layout is written and
//! read by the two adjacent arms of [`Packet::write`] and [`Packet::read`];
//! change one and the other must follow.
//!
//! ## Layouts
//!
//! ```text
//! LoadLevel      str level
//! Kick           u8 reason
//! SpawnBullet    u64 sender, u8 weapon, Vec3 origin, Vec3 direction
//! SpawnHitscan   u64 sender, u8 beam type, Vec3 origin, Vec3 end
//! SpawnCannon    u64 sender, Vec3 origin, Vec3 velocity
//! DamageEntity   u64 sender, u64 target, f32 amount, u8 kind, Vec3 direction
//! KillEntity     u64 sender, u64 target
//! Punch          u64 sender, u8 kind, Vec3 position
//! Point          u64 sender, Vec3 position, Vec3 normal
//! Spray          u64 sender, Vec3 position, Vec3 normal, Color tint
//! Style          u64 sender, Color body, u8 preset
//! ActivateObject u32 index, bool active
//! CinemaAction   str action
//! Vote           u64 sender, u8 option
//! ImageChunk     u64 sender, u16 index, blob data
//! RequestImage   u64 sender, u64 owner
//! Version        u64 sender, u8 major, u8 minor, u8 patch
//! DestroyEntity  u64 target
//! ```
//!
//! Packets that peers originate start with the sender so the host can check
//! it against the transport-level identity before relaying.

use super::codec::{Reader, Writer, VEC3_SIZE};
use crate::error::{CodecError, CodecResult};
use tether_shared::{
    Color, DamageKind, EntityCategory, EntityId, EntityType, KickReason, PacketType, PeerId, Vec3,
};

/// Kind of melee effect carried by [`Packet::Punch`].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PunchKind {
    /// Plain punch.
    Jab = 0,
    /// Parry of a projectile or melee hit.
    Parry = 1,
    /// Heavy arm shockwave.
    Blast = 2,
}

impl PunchKind {
    /// Decodes a wire tag.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Jab),
            1 => Some(Self::Parry),
            2 => Some(Self::Blast),
            _ => None,
        }
    }
}

/// A decoded directive. Strings and blobs borrow from the received message.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Packet<'a> {
    LoadLevel {
        level: &'a str,
    },
    Kick {
        reason: KickReason,
    },
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
    DamageEntity {
        sender: PeerId,
        target: EntityId,
        amount: f32,
        kind: DamageKind,
        direction: Vec3,
    },
    KillEntity {
        sender: PeerId,
        target: EntityId,
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
    ActivateObject {
        index: u32,
        active: bool,
    },
    CinemaAction {
        action: &'a str,
    },
    Vote {
        sender: PeerId,
        option: u8,
    },
    ImageChunk {
        sender: PeerId,
        index: u16,
        data: &'a [u8],
    },
    RequestImage {
        sender: PeerId,
        owner: PeerId,
    },
    Version {
        sender: PeerId,
        major: u8,
        minor: u8,
        patch: u8,
    },
    DestroyEntity {
        target: EntityId,
    },
}

impl<'a> Packet<'a> {
    /// Channel this packet travels on.
    #[must_use]
    pub const fn kind(&self) -> PacketType {
        match self {
            Self::LoadLevel { .. } => PacketType::LoadLevel,
            Self::Kick { .. } => PacketType::Kick,
            Self::SpawnBullet { .. } => PacketType::SpawnBullet,
            Self::SpawnHitscan { .. } => PacketType::SpawnHitscan,
            Self::SpawnCannon { .. } => PacketType::SpawnCannon,
            Self::DamageEntity { .. } => PacketType::DamageEntity,
            Self::KillEntity { .. } => PacketType::KillEntity,
            Self::Punch { .. } => PacketType::Punch,
            Self::Point { .. } => PacketType::Point,
            Self::Spray { .. } => PacketType::Spray,
            Self::Style { .. } => PacketType::Style,
            Self::ActivateObject { .. } => PacketType::ActivateObject,
            Self::CinemaAction { .. } => PacketType::CinemaAction,
            Self::Vote { .. } => PacketType::Vote,
            Self::ImageChunk { .. } => PacketType::ImageChunk,
            Self::RequestImage { .. } => PacketType::RequestImage,
            Self::Version { .. } => PacketType::Version,
            Self::DestroyEntity { .. } => PacketType::DestroyEntity,
        }
    }

    /// The peer this packet claims to come from, for packets peers originate.
    #[must_use]
    pub const fn sender(&self) -> Option<PeerId> {
        match self {
            Self::SpawnBullet { sender, .. }
            | Self::SpawnHitscan { sender, .. }
            | Self::SpawnCannon { sender, .. }
            | Self::DamageEntity { sender, .. }
            | Self::KillEntity { sender, .. }
            | Self::Punch { sender, .. }
            | Self::Point { sender, .. }
            | Self::Spray { sender, .. }
            | Self::Style { sender, .. }
            | Self::Vote { sender, .. }
            | Self::ImageChunk { sender, .. }
            | Self::RequestImage { sender, .. }
            | Self::Version { sender, .. } => Some(*sender),
            Self::LoadLevel { .. }
            | Self::Kick { .. }
            | Self::ActivateObject { .. }
            | Self::CinemaAction { .. }
            | Self::DestroyEntity { .. } => None,
        }
    }

    /// Exact number of bytes [`Packet::write`] produces.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        const ID: usize = 8;
        match self {
            Self::LoadLevel { level } => 1 + level.len(),
            Self::Kick { .. } => 1,
            Self::SpawnBullet { .. } => ID + 1 + 2 * VEC3_SIZE,
            Self::SpawnHitscan { .. } => ID + 1 + 2 * VEC3_SIZE,
            Self::SpawnCannon { .. } | Self::Point { .. } => ID + 2 * VEC3_SIZE,
            Self::DamageEntity { .. } => ID + ID + 4 + 1 + VEC3_SIZE,
            Self::KillEntity { .. } | Self::RequestImage { .. } => 2 * ID,
            Self::Punch { .. } => ID + 1 + VEC3_SIZE,
            Self::Spray { .. } => ID + 2 * VEC3_SIZE + 4,
            Self::Style { .. } => ID + 4 + 1,
            Self::ActivateObject { .. } => 4 + 1,
            Self::CinemaAction { action } => 1 + action.len(),
            Self::Vote { .. } => ID + 1,
            Self::ImageChunk { data, .. } => ID + 2 + 2 + data.len(),
            Self::Version { .. } => ID + 3,
            Self::DestroyEntity { .. } => ID,
        }
    }

    /// Encodes the packet body.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] if the buffer is too small.
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        match *self {
            Self::LoadLevel { level } => w.write_str(level),
            Self::Kick { reason } => w.write_u8(reason as u8),
            Self::SpawnBullet {
                sender,
                weapon,
                origin,
                direction,
            } => {
                w.write_peer(sender)?;
                w.write_u8(weapon)?;
                w.write_vec3(origin)?;
                w.write_vec3(direction)
            }
            Self::SpawnHitscan {
                sender,
                beam,
                origin,
                end,
            } => {
                w.write_peer(sender)?;
                w.write_u8(beam.to_u8())?;
                w.write_vec3(origin)?;
                w.write_vec3(end)
            }
            Self::SpawnCannon {
                sender,
                origin,
                velocity,
            } => {
                w.write_peer(sender)?;
                w.write_vec3(origin)?;
                w.write_vec3(velocity)
            }
            Self::DamageEntity {
                sender,
                target,
                amount,
                kind,
                direction,
            } => {
                w.write_peer(sender)?;
                w.write_entity(target)?;
                w.write_f32(amount)?;
                w.write_u8(kind as u8)?;
                w.write_vec3(direction)
            }
            Self::KillEntity { sender, target } => {
                w.write_peer(sender)?;
                w.write_entity(target)
            }
            Self::Punch {
                sender,
                kind,
                position,
            } => {
                w.write_peer(sender)?;
                w.write_u8(kind as u8)?;
                w.write_vec3(position)
            }
            Self::Point {
                sender,
                position,
                normal,
            } => {
                w.write_peer(sender)?;
                w.write_vec3(position)?;
                w.write_vec3(normal)
            }
            Self::Spray {
                sender,
                position,
                normal,
                tint,
            } => {
                w.write_peer(sender)?;
                w.write_vec3(position)?;
                w.write_vec3(normal)?;
                w.write_color(tint)
            }
            Self::Style {
                sender,
                body,
                preset,
            } => {
                w.write_peer(sender)?;
                w.write_color(body)?;
                w.write_u8(preset)
            }
            Self::ActivateObject { index, active } => {
                w.write_u32(index)?;
                w.write_bool(active)
            }
            Self::CinemaAction { action } => w.write_str(action),
            Self::Vote { sender, option } => {
                w.write_peer(sender)?;
                w.write_u8(option)
            }
            Self::ImageChunk {
                sender,
                index,
                data,
            } => {
                w.write_peer(sender)?;
                w.write_u16(index)?;
                w.write_blob(data)
            }
            Self::RequestImage { sender, owner } => {
                w.write_peer(sender)?;
                w.write_peer(owner)
            }
            Self::Version {
                sender,
                major,
                minor,
                patch,
            } => {
                w.write_peer(sender)?;
                w.write_u8(major)?;
                w.write_u8(minor)?;
                w.write_u8(patch)
            }
            Self::DestroyEntity { target } => w.write_entity(target),
        }
    }

    /// Decodes a packet body received on channel `kind`.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`] describing why the bytes are not a valid `kind`.
    pub fn read(kind: PacketType, r: &mut Reader<'a>) -> CodecResult<Self> {
        Ok(match kind {
            PacketType::Snapshot => return Err(CodecError::UnknownPacketType(kind.to_u8())),
            PacketType::LoadLevel => Self::LoadLevel {
                level: r.read_str()?,
            },
            PacketType::Kick => {
                let value = r.read_u8()?;
                Self::Kick {
                    reason: KickReason::from_u8(value).ok_or(CodecError::UnknownEnum {
                        what: "kick reason",
                        value,
                    })?,
                }
            }
            PacketType::SpawnBullet => Self::SpawnBullet {
                sender: r.read_peer()?,
                weapon: r.read_u8()?,
                origin: r.read_vec3()?,
                direction: r.read_vec3()?,
            },
            PacketType::SpawnHitscan => Self::SpawnHitscan {
                sender: r.read_peer()?,
                beam: read_beam(r)?,
                origin: r.read_vec3()?,
                end: r.read_vec3()?,
            },
            PacketType::SpawnCannon => Self::SpawnCannon {
                sender: r.read_peer()?,
                origin: r.read_vec3()?,
                velocity: r.read_vec3()?,
            },
            PacketType::DamageEntity => Self::DamageEntity {
                sender: r.read_peer()?,
                target: r.read_entity()?,
                amount: r.read_f32()?,
                kind: {
                    let value = r.read_u8()?;
                    DamageKind::from_u8(value).ok_or(CodecError::UnknownEnum {
                        what: "damage kind",
                        value,
                    })?
                },
                direction: r.read_vec3()?,
            },
            PacketType::KillEntity => Self::KillEntity {
                sender: r.read_peer()?,
                target: r.read_entity()?,
            },
            PacketType::Punch => Self::Punch {
                sender: r.read_peer()?,
                kind: {
                    let value = r.read_u8()?;
                    PunchKind::from_u8(value).ok_or(CodecError::UnknownEnum {
                        what: "punch kind",
                        value,
                    })?
                },
                position: r.read_vec3()?,
            },
            PacketType::Point => Self::Point {
                sender: r.read_peer()?,
                position: r.read_vec3()?,
                normal: r.read_vec3()?,
            },
            PacketType::Spray => Self::Spray {
                sender: r.read_peer()?,
                position: r.read_vec3()?,
                normal: r.read_vec3()?,
                tint: r.read_color()?,
            },
            PacketType::Style => Self::Style {
                sender: r.read_peer()?,
                body: r.read_color()?,
                preset: r.read_u8()?,
            },
            PacketType::ActivateObject => Self::ActivateObject {
                index: r.read_u32()?,
                active: r.read_bool()?,
            },
            PacketType::CinemaAction => Self::CinemaAction {
                action: r.read_str()?,
            },
            PacketType::Vote => Self::Vote {
                sender: r.read_peer()?,
                option: r.read_u8()?,
            },
            PacketType::ImageChunk => Self::ImageChunk {
                sender: r.read_peer()?,
                index: r.read_u16()?,
                data: r.read_blob()?,
            },
            PacketType::RequestImage => Self::RequestImage {
                sender: r.read_peer()?,
                owner: r.read_peer()?,
            },
            PacketType::Version => Self::Version {
                sender: r.read_peer()?,
                major: r.read_u8()?,
                minor: r.read_u8()?,
                patch: r.read_u8()?,
            },
            PacketType::DestroyEntity => Self::DestroyEntity {
                target: r.read_entity()?,
            },
        })
    }

    /// Decodes a whole message, rejecting leftover bytes.
    ///
    /// # Errors
    ///
    /// Any [`CodecError`] from [`Packet::read`], or
    /// [`CodecError::TrailingBytes`].
    pub fn decode(kind: PacketType, bytes: &'a [u8]) -> CodecResult<Self> {
        let mut r = Reader::new(bytes);
        let packet = Self::read(kind, &mut r)?;
        if !r.is_exhausted() {
            return Err(CodecError::TrailingBytes(r.remaining()));
        }
        Ok(packet)
    }
}

fn read_beam(r: &mut Reader<'_>) -> CodecResult<EntityType> {
    let value = r.read_u8()?;
    EntityType::from_u8(value)
        .filter(|ty| ty.category() == EntityCategory::Hitscan)
        .ok_or(CodecError::UnknownEnum {
            what: "hitscan type",
            value,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Packet<'static>> {
        let sender = PeerId(76_561_198_000_000_042);
        let v = Vec3::new(1.5, -2.0, 30.25);
        vec![
            Packet::LoadLevel { level: "Level 0-1" },
            Packet::Kick {
                reason: KickReason::Banned,
            },
            Packet::SpawnBullet {
                sender,
                weapon: 3,
                origin: v,
                direction: Vec3::Y,
            },
            Packet::SpawnHitscan {
                sender,
                beam: EntityType::RailBeam,
                origin: v,
                end: Vec3::ZERO,
            },
            Packet::SpawnCannon {
                sender,
                origin: v,
                velocity: Vec3::Y,
            },
            Packet::DamageEntity {
                sender,
                target: EntityId(9),
                amount: 2.5,
                kind: DamageKind::Explosion,
                direction: v,
            },
            Packet::KillEntity {
                sender,
                target: EntityId(9),
            },
            Packet::Punch {
                sender,
                kind: PunchKind::Parry,
                position: v,
            },
            Packet::Point {
                sender,
                position: v,
                normal: Vec3::Y,
            },
            Packet::Spray {
                sender,
                position: v,
                normal: Vec3::Y,
                tint: Color::rgba(255, 0, 128, 255),
            },
            Packet::Style {
                sender,
                body: Color::WHITE,
                preset: 4,
            },
            Packet::ActivateObject {
                index: 77,
                active: true,
            },
            Packet::CinemaAction { action: "intro" },
            Packet::Vote { sender, option: 2 },
            Packet::ImageChunk {
                sender,
                index: 3,
                data: &[1, 2, 3, 4, 5],
            },
            Packet::RequestImage {
                sender,
                owner: PeerId(5),
            },
            Packet::Version {
                sender,
                major: 1,
                minor: 2,
                patch: 0,
            },
            Packet::DestroyEntity {
                target: EntityId(11),
            },
        ]
    }

    #[test]
    fn test_every_directive_round_trips() {
        for packet in samples() {
            let mut buf = vec![0u8; packet.encoded_len()];
            let mut w = Writer::new(&mut buf);
            packet.write(&mut w).unwrap();
            assert_eq!(w.len(), packet.encoded_len(), "{:?}", packet.kind());

            let decoded = Packet::decode(packet.kind(), &buf).unwrap();
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_samples_cover_every_directive() {
        let kinds: Vec<_> = samples().iter().map(Packet::kind).collect();
        for kind in PacketType::ALL {
            assert_eq!(
                kinds.contains(&kind),
                kind != PacketType::Snapshot,
                "{kind:?}"
            );
        }
    }

    #[test]
    fn test_sender_is_first_field() {
        for packet in samples() {
            let Some(sender) = packet.sender() else {
                continue;
            };
            let mut buf = vec![0u8; packet.encoded_len()];
            packet.write(&mut Writer::new(&mut buf)).unwrap();
            assert_eq!(Reader::new(&buf).read_peer().unwrap(), sender);
        }
    }

    #[test]
    fn test_truncated_directive_is_rejected() {
        let packet = Packet::KillEntity {
            sender: PeerId(1),
            target: EntityId(2),
        };
        let mut buf = [0u8; 16];
        packet.write(&mut Writer::new(&mut buf)).unwrap();
        assert!(matches!(
            Packet::decode(PacketType::KillEntity, &buf[..12]),
            Err(CodecError::ReadOverflow { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let buf = [0u8; 9];
        assert_eq!(
            Packet::decode(PacketType::DestroyEntity, &buf),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_hitscan_type_must_be_a_beam() {
        let packet = Packet::SpawnHitscan {
            sender: PeerId(1),
            beam: EntityType::Coin,
            origin: Vec3::ZERO,
            end: Vec3::ZERO,
        };
        let mut buf = vec![0u8; packet.encoded_len()];
        packet.write(&mut Writer::new(&mut buf)).unwrap();
        assert!(matches!(
            Packet::decode(PacketType::SpawnHitscan, &buf),
            Err(CodecError::UnknownEnum { what: "hitscan type", .. })
        ));
    }

    #[test]
    fn test_snapshot_is_not_a_directive() {
        assert!(Packet::decode(PacketType::Snapshot, &[]).is_err());
    }
}
