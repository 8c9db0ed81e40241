//! Protocol enumerations shared by every peer.
//!
//! The transport dispatches on [`PacketType`]; each message carries exactly
//! one packet and nothing on the wire says how long its payload is.

use serde::{Deserialize, Serialize};

/// Message shape identifier, used by the transport as the channel key.
///
/// APPEND-ONLY: new packet types go at the end.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PacketType {
    /// Sequence of `(id, type, payload)` triples.
    Snapshot = 0,
    /// Host tells peers to change level.
    LoadLevel = 1,
    /// Host removes a peer from the session.
    Kick = 2,
    /// A peer fired a bullet.
    SpawnBullet = 3,
    /// A peer fired a hitscan beam.
    SpawnHitscan = 4,
    /// A peer fired a cannonball.
    SpawnCannon = 5,
    /// Damage dealt to an entity.
    DamageEntity = 6,
    /// An entity's authority reports it dead.
    KillEntity = 7,
    /// Punch or parry effect.
    Punch = 8,
    /// Pointing marker.
    Point = 9,
    /// Spray marker placement.
    Spray = 10,
    /// Player customization.
    Style = 11,
    /// Host toggles a level object.
    ActivateObject = 12,
    /// Host starts a cutscene action.
    CinemaAction = 13,
    /// Vote cast.
    Vote = 14,
    /// Piece of a spray image.
    ImageChunk = 15,
    /// Request for a peer's spray image.
    RequestImage = 16,
    /// Protocol version handshake.
    Version = 17,
    /// Host removes an entity without a death.
    DestroyEntity = 18,
}

/// How the host treats an inbound packet of a given type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelayClass {
    /// Routed through the entity registry.
    Snapshot,
    /// Sender-checked, then forwarded verbatim to every other peer.
    Redirect,
    /// Sender-checked, applied on the host, then rebroadcast.
    Apply,
    /// Only the host may send these.
    HostOnly,
    /// Version exchange at join.
    Handshake,
}

impl PacketType {
    /// Number of defined packet types.
    pub const COUNT: usize = 19;

    /// Every packet type in discriminant order, which is also drain order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Snapshot,
        Self::LoadLevel,
        Self::Kick,
        Self::SpawnBullet,
        Self::SpawnHitscan,
        Self::SpawnCannon,
        Self::DamageEntity,
        Self::KillEntity,
        Self::Punch,
        Self::Point,
        Self::Spray,
        Self::Style,
        Self::ActivateObject,
        Self::CinemaAction,
        Self::Vote,
        Self::ImageChunk,
        Self::RequestImage,
        Self::Version,
        Self::DestroyEntity,
    ];

    /// Decodes a channel number.
    #[inline]
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Channel number.
    #[inline]
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Host-side handling class.
    #[must_use]
    pub const fn relay_class(self) -> RelayClass {
        match self {
            Self::Snapshot => RelayClass::Snapshot,
            Self::SpawnBullet
            | Self::SpawnHitscan
            | Self::SpawnCannon
            | Self::Punch
            | Self::Point
            | Self::Spray
            | Self::Style
            | Self::Vote
            | Self::ImageChunk
            | Self::RequestImage => RelayClass::Redirect,
            Self::DamageEntity | Self::KillEntity => RelayClass::Apply,
            Self::LoadLevel
            | Self::Kick
            | Self::ActivateObject
            | Self::CinemaAction
            | Self::DestroyEntity => RelayClass::HostOnly,
            Self::Version => RelayClass::Handshake,
        }
    }

    /// Delivery guarantee used when sending this packet type.
    #[must_use]
    pub const fn reliability(self) -> Reliability {
        match self {
            Self::Snapshot | Self::Point => Reliability::Unreliable,
            _ => Reliability::Reliable,
        }
    }
}

/// Delivery guarantee requested from the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reliability {
    /// May be dropped, duplicated or reordered.
    Unreliable,
    /// Delivered once, in order per channel.
    Reliable,
}

/// Why the host removed a peer.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KickReason {
    /// On the host's ban list.
    Banned = 0,
    /// Protocol versions differ.
    VersionMismatch = 1,
    /// Removed by the host player.
    Kicked = 2,
    /// The host closed the session.
    HostLeft = 3,
}

impl KickReason {
    /// Decodes a wire tag.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Banned),
            1 => Some(Self::VersionMismatch),
            2 => Some(Self::Kicked),
            3 => Some(Self::HostLeft),
            _ => None,
        }
    }

    /// Text shown to the removed player.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Banned => "You are banned from this lobby.",
            Self::VersionMismatch => "Your version does not match the host's.",
            Self::Kicked => "You were kicked by the host.",
            Self::HostLeft => "The host closed the lobby.",
        }
    }
}

/// Source of a hit.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageKind {
    /// Beam or bullet.
    Hitscan = 0,
    /// Physical projectile.
    Projectile = 1,
    /// Area explosion.
    Explosion = 2,
    /// Punch or blade.
    Melee = 3,
    /// Hazards.
    Environment = 4,
}

impl DamageKind {
    /// Decodes a wire tag.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Hitscan),
            1 => Some(Self::Projectile),
            2 => Some(Self::Explosion),
            3 => Some(Self::Melee),
            4 => Some(Self::Environment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_tags_are_append_only() {
        for (i, kind) in PacketType::ALL.iter().enumerate() {
            assert_eq!(usize::from(kind.to_u8()), i);
        }
        // Pinned so a reorder shows up as a test failure.
        assert_eq!(PacketType::Snapshot.to_u8(), 0);
        assert_eq!(PacketType::RequestImage.to_u8(), 16);
        assert_eq!(PacketType::Version.to_u8(), 17);
        assert_eq!(PacketType::DestroyEntity.to_u8(), 18);
        assert_eq!(PacketType::from_u8(19), None);
    }

    #[test]
    fn test_relay_classes() {
        assert_eq!(PacketType::Punch.relay_class(), RelayClass::Redirect);
        assert_eq!(PacketType::Vote.relay_class(), RelayClass::Redirect);
        assert_eq!(PacketType::KillEntity.relay_class(), RelayClass::Apply);
        assert_eq!(PacketType::Kick.relay_class(), RelayClass::HostOnly);
        assert_eq!(PacketType::Snapshot.reliability(), Reliability::Unreliable);
        assert_eq!(PacketType::LoadLevel.reliability(), Reliability::Reliable);
    }

    #[test]
    fn test_small_enums_decode() {
        assert_eq!(KickReason::from_u8(1), Some(KickReason::VersionMismatch));
        assert_eq!(KickReason::from_u8(9), None);
        assert_eq!(DamageKind::from_u8(3), Some(DamageKind::Melee));
        assert_eq!(DamageKind::from_u8(5), None);
    }
}
