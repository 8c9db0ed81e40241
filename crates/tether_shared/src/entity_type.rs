//! # Entity Types
//!
//! The closed set of replicable object kinds. Each category owns one
//! contiguous range of discriminants so that a vendor can claim its range
//! with a single comparison.
//!
//! ```text
//!  0        Player
//!  1 ..= 12 Enemy       (10 ..= 12 bosses)
//! 13 ..= 17 Weapon      (index only)
//! 18 ..= 22 Item
//! 23        Coin
//! 24 ..= 26 Projectile
//! 27 ..= 29 Hitscan     (index only)
//! ```

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Replicable object kind. Fixed at creation.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum EntityType {
    Player = 0,

    Husk = 1,
    Ranger = 2,
    Brute = 3,
    Drone = 4,
    Sentry = 5,
    Flamer = 6,
    Bladesman = 7,
    Mindflayer = 8,
    Idol = 9,
    Colossus = 10,
    Seraph = 11,
    Leviathan = 12,

    Revolver = 13,
    Shotgun = 14,
    Nailgun = 15,
    Railcannon = 16,
    RocketLauncher = 17,

    BlueSkull = 18,
    RedSkull = 19,
    Torch = 20,
    Book = 21,
    Plushie = 22,

    Coin = 23,

    Rocket = 24,
    Cannonball = 25,
    Grenade = 26,

    RevolverBeam = 27,
    ChargedBeam = 28,
    RailBeam = 29,
}

/// Coarse grouping of [`EntityType`]s sharing one payload layout and vendor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    /// A human peer's avatar.
    Player,
    /// Level enemies, bosses included.
    Enemy,
    /// Held weapons; identified but never replicated standalone.
    Weapon,
    /// Pickups that can be carried and thrown.
    Item,
    /// Thrown coins.
    Coin,
    /// Physical projectiles.
    Projectile,
    /// Instant beams; identified but never replicated standalone.
    Hitscan,
}

impl EntityCategory {
    /// Discriminant range owned by this category.
    #[must_use]
    pub const fn range(self) -> RangeInclusive<u8> {
        match self {
            Self::Player => 0..=0,
            Self::Enemy => 1..=12,
            Self::Weapon => 13..=17,
            Self::Item => 18..=22,
            Self::Coin => 23..=23,
            Self::Projectile => 24..=26,
            Self::Hitscan => 27..=29,
        }
    }

    /// Whether entities of this category exist in the registry.
    #[must_use]
    pub const fn is_replicated(self) -> bool {
        !matches!(self, Self::Weapon | Self::Hitscan)
    }
}

impl EntityType {
    /// Number of defined types.
    pub const COUNT: usize = 30;

    /// Every type in discriminant order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Player,
        Self::Husk,
        Self::Ranger,
        Self::Brute,
        Self::Drone,
        Self::Sentry,
        Self::Flamer,
        Self::Bladesman,
        Self::Mindflayer,
        Self::Idol,
        Self::Colossus,
        Self::Seraph,
        Self::Leviathan,
        Self::Revolver,
        Self::Shotgun,
        Self::Nailgun,
        Self::Railcannon,
        Self::RocketLauncher,
        Self::BlueSkull,
        Self::RedSkull,
        Self::Torch,
        Self::Book,
        Self::Plushie,
        Self::Coin,
        Self::Rocket,
        Self::Cannonball,
        Self::Grenade,
        Self::RevolverBeam,
        Self::ChargedBeam,
        Self::RailBeam,
    ];

    /// Decodes a wire tag.
    #[inline]
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    /// Wire tag.
    #[inline]
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Category this type belongs to.
    #[must_use]
    pub const fn category(self) -> EntityCategory {
        match self as u8 {
            0 => EntityCategory::Player,
            1..=12 => EntityCategory::Enemy,
            13..=17 => EntityCategory::Weapon,
            18..=22 => EntityCategory::Item,
            23 => EntityCategory::Coin,
            24..=26 => EntityCategory::Projectile,
            _ => EntityCategory::Hitscan,
        }
    }

    /// Boss-only enemies. Only the host may create these.
    #[must_use]
    pub const fn is_boss(self) -> bool {
        matches!(self, Self::Colossus | Self::Seraph | Self::Leviathan)
    }

    /// Name of the simulation object this type binds to.
    #[must_use]
    pub const fn object_name(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Husk => "Husk",
            Self::Ranger => "Ranger",
            Self::Brute => "Brute",
            Self::Drone => "Drone",
            Self::Sentry => "Sentry",
            Self::Flamer => "Flamer",
            Self::Bladesman => "Bladesman",
            Self::Mindflayer => "Mindflayer",
            Self::Idol => "Idol",
            Self::Colossus => "Colossus",
            Self::Seraph => "Seraph",
            Self::Leviathan => "Leviathan",
            Self::Revolver => "Revolver",
            Self::Shotgun => "Shotgun",
            Self::Nailgun => "Nailgun",
            Self::Railcannon => "Railcannon",
            Self::RocketLauncher => "RocketLauncher",
            Self::BlueSkull => "BlueSkull",
            Self::RedSkull => "RedSkull",
            Self::Torch => "Torch",
            Self::Book => "Book",
            Self::Plushie => "Plushie",
            Self::Coin => "Coin",
            Self::Rocket => "Rocket",
            Self::Cannonball => "Cannonball",
            Self::Grenade => "Grenade",
            Self::RevolverBeam => "RevolverBeam",
            Self::ChargedBeam => "ChargedBeam",
            Self::RailBeam => "RailBeam",
        }
    }

    /// Finds the type of a simulation object within `category`.
    ///
    /// Spawned copies carry a ` (Clone)` style suffix after the base name, so
    /// only the leading identifier is compared.
    #[must_use]
    pub fn identify(name: &str, category: EntityCategory) -> Option<Self> {
        let base = name
            .split(|c: char| !c.is_ascii_alphanumeric())
            .next()
            .unwrap_or_default();
        category
            .range()
            .filter_map(Self::from_u8)
            .find(|ty| ty.object_name() == base)
    }
}
