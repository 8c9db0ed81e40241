//! # Entity Payloads
//!
//! The bytes one snapshot triple carries after its `(id, type)` header. There
//! is one plain struct per category, and the tagged [`EntityPayload`] routes
//! on [`EntityType::category`].
//!
//! ## Layouts
//!
//! ```text
//! Player      u8 health, Vec3 position, f32 yaw, f32 pitch, u16 state,
//!             u8 flags, [Vec3 hook]          if flags & HOOKING
//! Enemy       u64 owner, f32 health, Vec3 position, f32 yaw, u8 flags
//! Item        u64 owner, Vec3 position, Vec3 rotation,
//!             u8 flags, [u64 holder]         if flags & HELD
//! Coin        u64 owner, Vec3 position, Vec3 velocity, u8 team,
//!             u8 flags, [u8 power]           if flags & SHOT
//! Projectile  u64 owner, Vec3 position, Vec3 direction,
//!             u8 flags, [u64 rider]          if flags & RIDDEN
//! ```
//!
//! Ownable layouts put the owner first, so a reader has synced ownership
//! before it looks at any live field. The bit that announces an optional
//! trailing field is derived from the `Option`, it is never stored in
//! `flags`, so the two cannot disagree. Undefined flag bits are dropped on
//! write and rejected on read.

use crate::error::{CodecError, CodecResult};
use crate::protocol::{PlayerState, Reader, Writer, PLAYER_STATE_SIZE, VEC3_SIZE};
use tether_shared::{EntityCategory, EntityType, PeerId, Vec3};

/// Bytes of the `(id, type)` header in front of every payload.
pub const TRIPLE_HEADER_SIZE: usize = 8 + 1;

const ID: usize = 8;

/// Player movement flags.
pub mod player_flags {
    /// Walking on ground.
    pub const WALKING: u8 = 1 << 0;
    /// Sliding.
    pub const SLIDING: u8 = 1 << 1;
    /// Airborne.
    pub const FALLING: u8 = 1 << 2;
    /// Mid-dash.
    pub const DASHING: u8 = 1 << 3;
    /// Derived: the hook point follows.
    pub const HOOKING: u8 = 1 << 4;
    /// Browsing a shop terminal.
    pub const SHOPPING: u8 = 1 << 5;
    /// Every defined bit.
    pub const ALL: u8 = (1 << 6) - 1;
}

/// Enemy state flags.
pub mod enemy_flags {
    /// Enraged variant.
    pub const ENRAGED: u8 = 1 << 0;
    /// Frozen in place.
    pub const FROZEN: u8 = 1 << 1;
    /// Shows the boss health bar.
    pub const BOSS_BAR: u8 = 1 << 2;
    /// Every defined bit.
    pub const ALL: u8 = (1 << 3) - 1;
}

/// Item state flags.
pub mod item_flags {
    /// Derived: the holder follows.
    pub const HELD: u8 = 1 << 0;
    /// Placed on an altar or pedestal.
    pub const PLACED: u8 = 1 << 1;
    /// Every defined bit.
    pub const ALL: u8 = (1 << 2) - 1;
}

/// Coin state flags.
pub mod coin_flags {
    /// Derived: the power byte follows.
    pub const SHOT: u8 = 1 << 0;
    /// Split into two coins by a ricochet.
    pub const SPLIT: u8 = 1 << 1;
    /// Every defined bit.
    pub const ALL: u8 = (1 << 2) - 1;
}

/// Projectile state flags.
pub mod projectile_flags {
    /// Frozen mid-air.
    pub const FROZEN: u8 = 1 << 0;
    /// Derived: the rider follows.
    pub const RIDDEN: u8 = 1 << 1;
    /// Charged by a parry.
    pub const CHARGED: u8 = 1 << 2;
    /// Every defined bit.
    pub const ALL: u8 = (1 << 3) - 1;
}

/// Reads a flags byte, rejecting undefined bits and stripping `derived`.
fn read_flags(r: &mut Reader<'_>, what: &'static str, all: u8, derived: u8) -> CodecResult<(u8, bool)> {
    let value = r.read_u8()?;
    if value & !all != 0 {
        return Err(CodecError::UnknownEnum { what, value });
    }
    Ok((value & !derived, value & derived != 0))
}

/// Combines stored flags with a derived presence bit.
const fn with_flag(flags: u8, bit: u8, present: bool) -> u8 {
    if present {
        flags | bit
    } else {
        flags & !bit
    }
}

/// Player state as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPayload {
    /// Health.
    pub health: u8,
    /// Feet position.
    pub position: Vec3,
    /// Body yaw.
    pub yaw: f32,
    /// Head pitch.
    pub pitch: f32,
    /// Team, weapon, emote.
    pub state: PlayerState,
    /// [`player_flags`] without the derived bit.
    pub flags: u8,
    /// Hook end point.
    pub hook: Option<Vec3>,
}

impl PlayerPayload {
    /// Largest encoded size.
    pub const MAX_SIZE: usize = 1 + VEC3_SIZE + 4 + 4 + PLAYER_STATE_SIZE + 1 + VEC3_SIZE;

    /// Encodes the payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] or [`CodecError::BitFieldRange`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        w.write_u8(self.health)?;
        w.write_vec3(self.position)?;
        w.write_f32(self.yaw)?;
        w.write_f32(self.pitch)?;
        self.state.write(w)?;
        w.write_u8(with_flag(self.flags & player_flags::ALL, player_flags::HOOKING, self.hook.is_some()))?;
        if let Some(hook) = self.hook {
            w.write_vec3(hook)?;
        }
        Ok(())
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Any read-side [`CodecError`].
    pub fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        let health = r.read_u8()?;
        let position = r.read_vec3()?;
        let yaw = r.read_f32()?;
        let pitch = r.read_f32()?;
        let state = PlayerState::read(r)?;
        let (flags, hooking) = read_flags(r, "player flags", player_flags::ALL, player_flags::HOOKING)?;
        let hook = if hooking { Some(r.read_vec3()?) } else { None };
        Ok(Self {
            health,
            position,
            yaw,
            pitch,
            state,
            flags,
            hook,
        })
    }
}

/// Enemy state as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyPayload {
    /// Peer simulating the enemy.
    pub owner: PeerId,
    /// Remaining health.
    pub health: f32,
    /// Position.
    pub position: Vec3,
    /// Facing.
    pub yaw: f32,
    /// [`enemy_flags`].
    pub flags: u8,
}

impl EnemyPayload {
    /// Encoded size.
    pub const MAX_SIZE: usize = ID + 4 + VEC3_SIZE + 4 + 1;

    /// Encodes the payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        w.write_peer(self.owner)?;
        w.write_f32(self.health)?;
        w.write_vec3(self.position)?;
        w.write_f32(self.yaw)?;
        w.write_u8(self.flags & enemy_flags::ALL)
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Any read-side [`CodecError`].
    pub fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        Ok(Self {
            owner: r.read_peer()?,
            health: r.read_f32()?,
            position: r.read_vec3()?,
            yaw: r.read_f32()?,
            flags: read_flags(r, "enemy flags", enemy_flags::ALL, 0)?.0,
        })
    }
}

/// Item state as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemPayload {
    /// Peer simulating the item.
    pub owner: PeerId,
    /// Position.
    pub position: Vec3,
    /// Euler rotation.
    pub rotation: Vec3,
    /// [`item_flags`] without the derived bit.
    pub flags: u8,
    /// Player holding the item.
    pub holder: Option<PeerId>,
}

impl ItemPayload {
    /// Largest encoded size.
    pub const MAX_SIZE: usize = ID + 2 * VEC3_SIZE + 1 + ID;

    /// Encodes the payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        w.write_peer(self.owner)?;
        w.write_vec3(self.position)?;
        w.write_vec3(self.rotation)?;
        w.write_u8(with_flag(self.flags & item_flags::ALL, item_flags::HELD, self.holder.is_some()))?;
        if let Some(holder) = self.holder {
            w.write_peer(holder)?;
        }
        Ok(())
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Any read-side [`CodecError`].
    pub fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        let owner = r.read_peer()?;
        let position = r.read_vec3()?;
        let rotation = r.read_vec3()?;
        let (flags, held) = read_flags(r, "item flags", item_flags::ALL, item_flags::HELD)?;
        let holder = if held { Some(r.read_peer()?) } else { None };
        Ok(Self {
            owner,
            position,
            rotation,
            flags,
            holder,
        })
    }
}

/// Coin state as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoinPayload {
    /// Peer simulating the coin.
    pub owner: PeerId,
    /// Position.
    pub position: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Team of the thrower, for friendly fire.
    pub team: u8,
    /// [`coin_flags`] without the derived bit.
    pub flags: u8,
    /// Ricochet power once shot.
    pub power: Option<u8>,
}

impl CoinPayload {
    /// Largest encoded size.
    pub const MAX_SIZE: usize = ID + 2 * VEC3_SIZE + 1 + 1 + 1;

    /// Encodes the payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        w.write_peer(self.owner)?;
        w.write_vec3(self.position)?;
        w.write_vec3(self.velocity)?;
        w.write_u8(self.team)?;
        w.write_u8(with_flag(self.flags & coin_flags::ALL, coin_flags::SHOT, self.power.is_some()))?;
        if let Some(power) = self.power {
            w.write_u8(power)?;
        }
        Ok(())
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Any read-side [`CodecError`].
    pub fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        let owner = r.read_peer()?;
        let position = r.read_vec3()?;
        let velocity = r.read_vec3()?;
        let team = r.read_u8()?;
        let (flags, shot) = read_flags(r, "coin flags", coin_flags::ALL, coin_flags::SHOT)?;
        let power = if shot { Some(r.read_u8()?) } else { None };
        Ok(Self {
            owner,
            position,
            velocity,
            team,
            flags,
            power,
        })
    }
}

/// Projectile state as carried on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectilePayload {
    /// Peer simulating the projectile.
    pub owner: PeerId,
    /// Position.
    pub position: Vec3,
    /// Flight direction.
    pub direction: Vec3,
    /// [`projectile_flags`] without the derived bit.
    pub flags: u8,
    /// Player riding the projectile.
    pub rider: Option<PeerId>,
}

impl ProjectilePayload {
    /// Largest encoded size.
    pub const MAX_SIZE: usize = ID + 2 * VEC3_SIZE + 1 + ID;

    /// Encodes the payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        w.write_peer(self.owner)?;
        w.write_vec3(self.position)?;
        w.write_vec3(self.direction)?;
        w.write_u8(with_flag(self.flags & projectile_flags::ALL, projectile_flags::RIDDEN, self.rider.is_some()))?;
        if let Some(rider) = self.rider {
            w.write_peer(rider)?;
        }
        Ok(())
    }

    /// Decodes the payload.
    ///
    /// # Errors
    ///
    /// Any read-side [`CodecError`].
    pub fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        let owner = r.read_peer()?;
        let position = r.read_vec3()?;
        let direction = r.read_vec3()?;
        let (flags, ridden) = read_flags(
            r,
            "projectile flags",
            projectile_flags::ALL,
            projectile_flags::RIDDEN,
        )?;
        let rider = if ridden { Some(r.read_peer()?) } else { None };
        Ok(Self {
            owner,
            position,
            direction,
            flags,
            rider,
        })
    }
}

/// Payload of any replicated category.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum EntityPayload {
    Player(PlayerPayload),
    Enemy(EnemyPayload),
    Item(ItemPayload),
    Coin(CoinPayload),
    Projectile(ProjectilePayload),
}

impl EntityPayload {
    /// Largest payload `ty` can produce, used to size buffers up front.
    #[must_use]
    pub const fn max_size(ty: EntityType) -> usize {
        match ty.category() {
            EntityCategory::Player => PlayerPayload::MAX_SIZE,
            EntityCategory::Enemy => EnemyPayload::MAX_SIZE,
            EntityCategory::Item => ItemPayload::MAX_SIZE,
            EntityCategory::Coin => CoinPayload::MAX_SIZE,
            EntityCategory::Projectile => ProjectilePayload::MAX_SIZE,
            EntityCategory::Weapon | EntityCategory::Hitscan => 0,
        }
    }

    /// Decodes the payload of a `ty` triple.
    ///
    /// # Errors
    ///
    /// [`CodecError::NotReplicated`] for index-only types, otherwise any
    /// read-side [`CodecError`].
    pub fn read(ty: EntityType, r: &mut Reader<'_>) -> CodecResult<Self> {
        Ok(match ty.category() {
            EntityCategory::Player => Self::Player(PlayerPayload::read(r)?),
            EntityCategory::Enemy => Self::Enemy(EnemyPayload::read(r)?),
            EntityCategory::Item => Self::Item(ItemPayload::read(r)?),
            EntityCategory::Coin => Self::Coin(CoinPayload::read(r)?),
            EntityCategory::Projectile => Self::Projectile(ProjectilePayload::read(r)?),
            EntityCategory::Weapon | EntityCategory::Hitscan => {
                return Err(CodecError::NotReplicated(ty))
            }
        })
    }

    /// Encodes the payload.
    ///
    /// # Errors
    ///
    /// [`CodecError::WriteOverflow`] or [`CodecError::BitFieldRange`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        match self {
            Self::Player(p) => p.write(w),
            Self::Enemy(p) => p.write(w),
            Self::Item(p) => p.write(w),
            Self::Coin(p) => p.write(w),
            Self::Projectile(p) => p.write(w),
        }
    }

    /// Category whose layout this payload uses.
    #[must_use]
    pub const fn category(&self) -> EntityCategory {
        match self {
            Self::Player(_) => EntityCategory::Player,
            Self::Enemy(_) => EntityCategory::Enemy,
            Self::Item(_) => EntityCategory::Item,
            Self::Coin(_) => EntityCategory::Coin,
            Self::Projectile(_) => EntityCategory::Projectile,
        }
    }

    /// Claimed owner. Players have none, they are always their own authority.
    #[must_use]
    pub const fn owner(&self) -> Option<PeerId> {
        match self {
            Self::Player(_) => None,
            Self::Enemy(p) => Some(p.owner),
            Self::Item(p) => Some(p.owner),
            Self::Coin(p) => Some(p.owner),
            Self::Projectile(p) => Some(p.owner),
        }
    }

    /// Position carried by the payload.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        match self {
            Self::Player(p) => p.position,
            Self::Enemy(p) => p.position,
            Self::Item(p) => p.position,
            Self::Coin(p) => p.position,
            Self::Projectile(p) => p.position,
        }
    }
}
