//! Simulated network conditions for the loopback transport.

use rand::Rng;
use serde::Deserialize;

/// Faults applied to unreliable traffic. Reliable traffic is never touched.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkConditions {
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: f32,
    /// Duplicate packet percentage (0-100).
    pub duplicate_percent: f32,
}

impl NetworkConditions {
    /// Perfect network conditions (LAN).
    pub const PERFECT: Self = Self {
        packet_loss_percent: 0.0,
        duplicate_percent: 0.0,
    };

    /// Average network conditions (cable).
    pub const AVERAGE: Self = Self {
        packet_loss_percent: 1.0,
        duplicate_percent: 1.0,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        packet_loss_percent: 5.0,
        duplicate_percent: 2.0,
    };

    /// Conditions with only packet loss.
    #[must_use]
    pub const fn lossy(packet_loss_percent: f32) -> Self {
        Self {
            packet_loss_percent,
            duplicate_percent: 0.0,
        }
    }

    /// Returns true if the packet should be dropped.
    pub fn should_drop<R: Rng>(&self, rng: &mut R) -> bool {
        self.packet_loss_percent > 0.0 && rng.gen::<f32>() * 100.0 < self.packet_loss_percent
    }

    /// Returns true if the packet should be delivered twice.
    pub fn should_duplicate<R: Rng>(&self, rng: &mut R) -> bool {
        self.duplicate_percent > 0.0 && rng.gen::<f32>() * 100.0 < self.duplicate_percent
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::PERFECT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_perfect_never_drops() {
        let mut rng = StdRng::seed_from_u64(1);
        let conditions = NetworkConditions::PERFECT;
        assert!((0..1000).all(|_| !conditions.should_drop(&mut rng)));
        assert!((0..1000).all(|_| !conditions.should_duplicate(&mut rng)));
    }

    #[test]
    fn test_loss_rate_is_roughly_respected() {
        let mut rng = StdRng::seed_from_u64(7);
        let conditions = NetworkConditions::lossy(20.0);
        let dropped = (0..10_000).filter(|_| conditions.should_drop(&mut rng)).count();
        assert!((1_500..2_500).contains(&dropped), "dropped {dropped}");
    }

    #[test]
    fn test_total_loss() {
        let mut rng = StdRng::seed_from_u64(3);
        let conditions = NetworkConditions::lossy(100.0);
        assert!((0..100).all(|_| conditions.should_drop(&mut rng)));
    }
}
