//! # TETHER Shared
//!
//! Types every peer must agree on, whether it is hosting or joining.
//!
//! ## CRITICAL RULE
//!
//! Discriminants of [`PacketType`], [`EntityType`] and the small wire enums are
//! part of the protocol. New values are appended, existing ones never move.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod entity_type;
pub mod ids;
pub mod math;
pub mod protocol;

pub use constants::{DEFAULT_TICK_RATE, LOCK_WINDOW_SECS, PROTOCOL_VERSION};
pub use entity_type::{EntityCategory, EntityType};
pub use ids::{EntityId, PeerId};
pub use math::{Color, Vec3};
pub use protocol::{DamageKind, KickReason, PacketType, RelayClass, Reliability};
