//! # Snapshot Interpolation
//!
//! Remote state arrives once per snapshot tick, but the object should glide
//! between updates instead of teleporting. Each replicated field a non-owner
//! displays is wrapped in an [`Interpolated`] value that blends from the
//! previous remote value to the latest one over one snapshot interval.
//!
//! ```text
//! value
//!   │            target ●━━━━━━━━━━
//!   │                 ╱
//!   │               ╱   sample(now)
//!   │   prev ●━━━━╱
//!   └──────────┼─────────┼─────────> now
//!          last_update   last_update + spacing
//! ```
//!
//! Staleness only ever affects the blend weight. Nothing here evicts.

use tether_shared::Vec3;

/// Types that can be blended linearly.
pub trait Lerp: Copy {
    /// Returns `self` moved toward `to` by fraction `t` in `0..=1`.
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Vec3 {
    #[inline]
    fn lerp(self, to: Self, t: f32) -> Self {
        Vec3::lerp(self, to, t)
    }
}

/// A remotely driven value blended between its last two updates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interpolated<T: Lerp> {
    /// Value at the start of the current blend.
    prev: T,
    /// Latest remote value.
    target: T,
    /// Session time the target arrived.
    last_update: f64,
}

impl<T: Lerp> Interpolated<T> {
    /// Starts at rest on `value`.
    #[must_use]
    pub const fn new(value: T) -> Self {
        Self {
            prev: value,
            target: value,
            last_update: 0.0,
        }
    }

    /// Feeds a new remote value. The blend restarts from where the display
    /// currently is, so a late update never snaps backwards.
    pub fn push(&mut self, value: T, now: f64, spacing: f32) {
        self.prev = self.sample(now, spacing);
        self.target = value;
        self.last_update = now;
    }

    /// Jumps straight to `value` with no blend.
    pub fn snap(&mut self, value: T, now: f64) {
        self.prev = value;
        self.target = value;
        self.last_update = now;
    }

    /// Latest remote value. This is what a peer that is not the owner reports
    /// when it has to write the field.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> T {
        self.target
    }

    /// Session time of the latest remote value.
    #[inline]
    #[must_use]
    pub const fn last_update(&self) -> f64 {
        self.last_update
    }

    /// Blended value at `now`, one `spacing` (seconds) after an update the
    /// target is reached.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(&self, now: f64, spacing: f32) -> T {
        if spacing <= 0.0 {
            return self.target;
        }
        let t = ((now - self.last_update) / f64::from(spacing)).clamp(0.0, 1.0) as f32;
        self.prev.lerp(self.target, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPACING: f32 = 0.1;

    #[test]
    fn test_starts_at_rest() {
        let v = Interpolated::new(Vec3::Y);
        assert_eq!(v.sample(5.0, SPACING), Vec3::Y);
    }

    #[test]
    fn test_linear_blend_over_one_interval() {
        let mut v = Interpolated::new(0.0f32);
        v.push(10.0, 1.0, SPACING);

        assert!((v.sample(1.0, SPACING) - 0.0).abs() < 1e-4);
        assert!((v.sample(1.05, SPACING) - 5.0).abs() < 1e-3);
        assert!((v.sample(1.1, SPACING) - 10.0).abs() < 1e-4);
        // Stale values hold the target rather than extrapolating.
        assert!((v.sample(9.0, SPACING) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_push_mid_blend_starts_from_display() {
        let mut v = Interpolated::new(0.0f32);
        v.push(10.0, 0.0, SPACING);
        v.push(20.0, 0.05, SPACING);

        assert!((v.sample(0.05, SPACING) - 5.0).abs() < 1e-3);
        assert!((v.target() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_snap() {
        let mut v = Interpolated::new(Vec3::ZERO);
        v.snap(Vec3::Y, 3.0);
        assert_eq!(v.sample(3.0, SPACING), Vec3::Y);
        assert!((v.last_update() - 3.0).abs() < f64::EPSILON);
    }
}
