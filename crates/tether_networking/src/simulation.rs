//! # Simulation Adapter
//!
//! The replication core never touches the game engine directly. Everything
//! it needs from the surrounding simulation goes through [`Simulation`].
//!
//! ```text
//! replication core          game
//! ┌───────────────┐        ┌────────────────────┐
//! │ Entity        │ ─────> │ impl Simulation    │
//! │ Registry      │        │  spawn / destroy   │
//! │ Endpoints     │ <───── │  transform, flags  │
//! └───────────────┘        └────────────────────┘
//! ```
//!
//! [`MockSimulation`] is a complete in-memory implementation used by tests
//! and by the LAN runner.

use crate::protocol::PlayerState;
use std::collections::HashMap;
use tether_shared::{DamageKind, EntityType, PeerId, Vec3};

/// Opaque reference to an object owned by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(pub u32);

/// Visual pose of a player doll.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerPose {
    /// Body yaw in degrees.
    pub yaw: f32,
    /// Head pitch in degrees.
    pub pitch: f32,
    /// Packed team/weapon/emote state.
    pub state: PlayerState,
    /// Movement flags, see `entity::player_flags`.
    pub flags: u8,
    /// Hook end point while hooking.
    pub hook: Option<Vec3>,
}

/// State of the player controlled on this machine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocalPlayer {
    /// Health, `0..=200`.
    pub health: u8,
    /// Feet position.
    pub position: Vec3,
    /// Everything that is not a transform.
    pub pose: PlayerPose,
}

/// Typed access to the game simulation.
pub trait Simulation {
    /// Instantiates the visual and physical representation of `ty`.
    fn spawn(&mut self, ty: EntityType) -> Option<ObjectHandle>;

    /// Removes an object immediately.
    fn destroy(&mut self, handle: ObjectHandle);

    /// Whether the object still exists.
    fn exists(&self, handle: ObjectHandle) -> bool;

    /// Name of the object, used by vendors to identify it.
    fn object_name(&self, handle: ObjectHandle) -> Option<&str>;

    /// World position.
    fn position(&self, handle: ObjectHandle) -> Option<Vec3>;

    /// Moves an object.
    fn set_position(&mut self, handle: ObjectHandle, position: Vec3);

    /// Euler rotation in degrees.
    fn rotation(&self, handle: ObjectHandle) -> Option<Vec3>;

    /// Rotates an object.
    fn set_rotation(&mut self, handle: ObjectHandle, rotation: Vec3);

    /// Linear velocity.
    fn velocity(&self, handle: ObjectHandle) -> Option<Vec3>;

    /// Sets linear velocity.
    fn set_velocity(&mut self, handle: ObjectHandle, velocity: Vec3);

    /// Whether physics is driven externally.
    fn is_kinematic(&self, handle: ObjectHandle) -> bool;

    /// Switches between simulated and externally driven physics.
    fn set_kinematic(&mut self, handle: ObjectHandle, kinematic: bool);

    /// Remaining health of an enemy.
    fn health(&self, handle: ObjectHandle) -> Option<f32>;

    /// Sets enemy health.
    fn set_health(&mut self, handle: ObjectHandle, health: f32);

    /// Plays the death of an object. It stays until destroyed.
    fn kill(&mut self, handle: ObjectHandle);

    /// Parents an object to a player's hand, or detaches it.
    fn set_holder(&mut self, handle: ObjectHandle, holder: Option<PeerId>);

    /// Applies a remote player's pose to its doll.
    fn pose_player(&mut self, handle: ObjectHandle, pose: &PlayerPose);

    /// State of the player controlled on this machine.
    fn local_player(&self) -> LocalPlayer;

    /// Hurts the player controlled on this machine.
    fn damage_local_player(&mut self, amount: f32, kind: DamageKind);

    /// Switches to another level.
    fn load_level(&mut self, level: &str);

    /// Leaves the session and shows `reason` on the main menu.
    fn return_to_menu(&mut self, reason: &str);
}

/// One object inside a [`MockSimulation`].
#[derive(Clone, Debug, PartialEq)]
pub struct MockObject {
    /// Object name.
    pub name: String,
    /// Type the object was spawned as.
    pub ty: EntityType,
    /// Position.
    pub position: Vec3,
    /// Rotation.
    pub rotation: Vec3,
    /// Velocity.
    pub velocity: Vec3,
    /// Kinematic flag.
    pub kinematic: bool,
    /// Health.
    pub health: f32,
    /// Set by `kill`.
    pub dead: bool,
    /// Current holder.
    pub holder: Option<PeerId>,
    /// Last applied player pose.
    pub pose: Option<PlayerPose>,
}

/// In-memory [`Simulation`].
#[derive(Debug, Default)]
pub struct MockSimulation {
    objects: HashMap<ObjectHandle, MockObject>,
    next_handle: u32,
    local: LocalPlayer,
    level: Option<String>,
    menu_reason: Option<String>,
    local_damage: f32,
}

impl MockSimulation {
    /// Creates an empty simulation with a full-health local player.
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: LocalPlayer {
                health: 100,
                ..LocalPlayer::default()
            },
            ..Self::default()
        }
    }

    /// Places an object as if the game had spawned it on its own.
    pub fn spawn_native(&mut self, ty: EntityType, position: Vec3) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(
            handle,
            MockObject {
                name: format!("{} (Clone)", ty.object_name()),
                ty,
                position,
                rotation: Vec3::ZERO,
                velocity: Vec3::ZERO,
                kinematic: false,
                health: if ty.is_boss() { 1000.0 } else { 10.0 },
                dead: false,
                holder: None,
                pose: None,
            },
        );
        handle
    }

    /// Inspects an object.
    #[must_use]
    pub fn object(&self, handle: ObjectHandle) -> Option<&MockObject> {
        self.objects.get(&handle)
    }

    /// Number of live objects.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects of one type.
    pub fn objects_of(&self, ty: EntityType) -> impl Iterator<Item = (ObjectHandle, &MockObject)> {
        self.objects
            .iter()
            .filter(move |(_, o)| o.ty == ty)
            .map(|(h, o)| (*h, o))
    }

    /// Replaces the local player's state.
    pub fn set_local_player(&mut self, local: LocalPlayer) {
        self.local = local;
    }

    /// Level loaded by the last `load_level`.
    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    /// Reason given to the last `return_to_menu`.
    #[must_use]
    pub fn menu_reason(&self) -> Option<&str> {
        self.menu_reason.as_deref()
    }

    /// Total damage the local player has taken.
    #[must_use]
    pub const fn local_damage(&self) -> f32 {
        self.local_damage
    }
}

impl Simulation for MockSimulation {
    fn spawn(&mut self, ty: EntityType) -> Option<ObjectHandle> {
        Some(self.spawn_native(ty, Vec3::ZERO))
    }

    fn destroy(&mut self, handle: ObjectHandle) {
        self.objects.remove(&handle);
    }

    fn exists(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn object_name(&self, handle: ObjectHandle) -> Option<&str> {
        self.objects.get(&handle).map(|o| o.name.as_str())
    }

    fn position(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.objects.get(&handle).map(|o| o.position)
    }

    fn set_position(&mut self, handle: ObjectHandle, position: Vec3) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.position = position;
        }
    }

    fn rotation(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.objects.get(&handle).map(|o| o.rotation)
    }

    fn set_rotation(&mut self, handle: ObjectHandle, rotation: Vec3) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.rotation = rotation;
        }
    }

    fn velocity(&self, handle: ObjectHandle) -> Option<Vec3> {
        self.objects.get(&handle).map(|o| o.velocity)
    }

    fn set_velocity(&mut self, handle: ObjectHandle, velocity: Vec3) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.velocity = velocity;
        }
    }

    fn is_kinematic(&self, handle: ObjectHandle) -> bool {
        self.objects.get(&handle).is_some_and(|o| o.kinematic)
    }

    fn set_kinematic(&mut self, handle: ObjectHandle, kinematic: bool) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.kinematic = kinematic;
        }
    }

    fn health(&self, handle: ObjectHandle) -> Option<f32> {
        self.objects.get(&handle).map(|o| o.health)
    }

    fn set_health(&mut self, handle: ObjectHandle, health: f32) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.health = health;
        }
    }

    fn kill(&mut self, handle: ObjectHandle) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.dead = true;
            o.health = 0.0;
        }
    }

    fn set_holder(&mut self, handle: ObjectHandle, holder: Option<PeerId>) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.holder = holder;
        }
    }

    fn pose_player(&mut self, handle: ObjectHandle, pose: &PlayerPose) {
        if let Some(o) = self.objects.get_mut(&handle) {
            o.pose = Some(*pose);
        }
    }

    fn local_player(&self) -> LocalPlayer {
        self.local
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn damage_local_player(&mut self, amount: f32, _kind: DamageKind) {
        self.local_damage += amount;
        let health = (f32::from(self.local.health) - amount).max(0.0);
        self.local.health = health as u8;
    }

    fn load_level(&mut self, level: &str) {
        self.level = Some(level.to_owned());
    }

    fn return_to_menu(&mut self, reason: &str) {
        self.menu_reason = Some(reason.to_owned());
    }
}
