//! # Player State Bit Packing
//!
//! The player state tuple travels in every player payload, so it is packed
//! into two bytes instead of five.
//!
//! ```text
//!  15 | 14     | 13 12 | 11 10 9 8 | 7 6 5 4 3 | 2 1 0
//!  -  | typing | rps   | emote     | weapon    | team
//! ```
//!
//! Weapon and emote use `0xFF` for "absent". On the wire that becomes the
//! all-ones pattern of the field and is restored to `0xFF` on read, so the
//! all-ones value itself is never a valid present index.

use super::codec::{Reader, Writer};
use crate::error::{CodecError, CodecResult};
use tether_shared::constants::ABSENT;

const TEAM_BITS: u32 = 3;
const WEAPON_BITS: u32 = 5;
const EMOTE_BITS: u32 = 4;
const RPS_BITS: u32 = 2;

const WEAPON_SHIFT: u32 = TEAM_BITS;
const EMOTE_SHIFT: u32 = WEAPON_SHIFT + WEAPON_BITS;
const RPS_SHIFT: u32 = EMOTE_SHIFT + EMOTE_BITS;
const TYPING_SHIFT: u32 = RPS_SHIFT + RPS_BITS;
const RESERVED_MASK: u16 = 1 << 15;

/// Encoded size of a [`PlayerState`].
pub const PLAYER_STATE_SIZE: usize = 2;

const fn ones(bits: u32) -> u16 {
    (1 << bits) - 1
}

/// Compact per-player flags that change rarely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerState {
    /// Team index, `0..=7`.
    pub team: u8,
    /// Held weapon slot, `0..=30`, or [`ABSENT`].
    pub weapon: u8,
    /// Active emote, `0..=14`, or [`ABSENT`].
    pub emote: u8,
    /// Rock-paper-scissors choice, `0..=3`.
    pub rps: u8,
    /// Chat box open.
    pub typing: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            team: 0,
            weapon: ABSENT,
            emote: ABSENT,
            rps: 0,
            typing: false,
        }
    }
}

/// Packs a plain field, rejecting values wider than the field.
fn plain(field: &'static str, value: u8, bits: u32) -> CodecResult<u16> {
    let value = u16::from(value);
    if value > ones(bits) {
        return Err(CodecError::BitFieldRange {
            field,
            value: value as u8,
        });
    }
    Ok(value)
}

/// Packs a field whose all-ones pattern means [`ABSENT`].
fn optional(field: &'static str, value: u8, bits: u32) -> CodecResult<u16> {
    if value == ABSENT {
        return Ok(ones(bits));
    }
    let packed = u16::from(value);
    // All-ones is reserved for the sentinel.
    if packed >= ones(bits) {
        return Err(CodecError::BitFieldRange { field, value });
    }
    Ok(packed)
}

/// Inverse of [`optional`].
#[allow(clippy::cast_possible_truncation)]
const fn restore(packed: u16, bits: u32) -> u8 {
    if packed == ones(bits) {
        ABSENT
    } else {
        packed as u8
    }
}

impl PlayerState {
    /// Packs into the 16-bit wire form.
    ///
    /// # Errors
    ///
    /// [`CodecError::BitFieldRange`] if any field does not fit its width.
    pub fn pack(&self) -> CodecResult<u16> {
        Ok(plain("team", self.team, TEAM_BITS)?
            | optional("weapon", self.weapon, WEAPON_BITS)? << WEAPON_SHIFT
            | optional("emote", self.emote, EMOTE_BITS)? << EMOTE_SHIFT
            | plain("rps", self.rps, RPS_BITS)? << RPS_SHIFT
            | u16::from(self.typing) << TYPING_SHIFT)
    }

    /// Unpacks the 16-bit wire form.
    ///
    /// # Errors
    ///
    /// [`CodecError::UnknownEnum`] if the reserved bit is set.
    #[allow(clippy::cast_possible_truncation)]
    pub fn unpack(bits: u16) -> CodecResult<Self> {
        if bits & RESERVED_MASK != 0 {
            return Err(CodecError::UnknownEnum {
                what: "player state",
                value: (bits >> 8) as u8,
            });
        }
        Ok(Self {
            team: (bits & ones(TEAM_BITS)) as u8,
            weapon: restore(bits >> WEAPON_SHIFT & ones(WEAPON_BITS), WEAPON_BITS),
            emote: restore(bits >> EMOTE_SHIFT & ones(EMOTE_BITS), EMOTE_BITS),
            rps: (bits >> RPS_SHIFT & ones(RPS_BITS)) as u8,
            typing: bits >> TYPING_SHIFT & 1 == 1,
        })
    }

    /// Writes the packed form.
    ///
    /// # Errors
    ///
    /// [`CodecError::BitFieldRange`] or [`CodecError::WriteOverflow`].
    pub fn write(&self, w: &mut Writer<'_>) -> CodecResult<()> {
        w.write_u16(self.pack()?)
    }

    /// Reads the packed form.
    ///
    /// # Errors
    ///
    /// [`CodecError::ReadOverflow`] or [`CodecError::UnknownEnum`].
    pub fn read(r: &mut Reader<'_>) -> CodecResult<Self> {
        Self::unpack(r.read_u16()?)
    }
}
