//! # Spawn Policy
//!
//! Which peer may bring which kind of entity into existence. Only the host
//! consults this; clients accept whatever the host broadcasts.
//!
//! | Creator | Player       | Enemy                       | Item, Coin, Projectile | Weapon, Hitscan |
//! |---------|--------------|-----------------------------|------------------------|-----------------|
//! | host    | its own      | any                         | yes                    | never           |
//! | client  | its own      | non-boss, when enabled      | yes                    | never           |

use serde::Deserialize;
use tether_shared::{EntityCategory, EntityId, EntityType, PeerId};

/// Creation rules enforced by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpawnPolicy {
    /// Clients may create ordinary enemies (never bosses).
    pub allow_client_enemies: bool,
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            allow_client_enemies: true,
        }
    }
}

impl SpawnPolicy {
    /// Whether `creator` may create entity `id` of kind `ty`.
    #[must_use]
    pub fn may_create(&self, creator: PeerId, host: PeerId, id: EntityId, ty: EntityType) -> bool {
        match ty.category() {
            EntityCategory::Player => id.peer() == creator,
            EntityCategory::Enemy if creator == host => true,
            EntityCategory::Enemy => self.allow_client_enemies && !ty.is_boss(),
            EntityCategory::Item | EntityCategory::Coin | EntityCategory::Projectile => true,
            EntityCategory::Weapon | EntityCategory::Hitscan => false,
        }
    }
}
