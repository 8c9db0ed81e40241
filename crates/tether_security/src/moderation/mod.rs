//! # Moderation
//!
//! Rate limits and escalation for the host.
//!
//! ## Ladder
//!
//! - **Limits**: per-peer sliding windows over packets, bytes and entity
//!   creations. The first overrun inside a window earns a warning; further
//!   overruns in the same window are dropped without another one.
//! - **Violations**: every broken rule earns a warning.
//! - **Ban**: reaching `warnings_before_ban` bans the peer. Bans outlive the
//!   peer's connection and last for the whole session.

mod window;

pub use window::SlidingWindow;

use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tether_networking::{Administration, Verdict, Violation};
use tether_shared::{EntityType, PacketType, PeerId};

/// Limits enforced by the [`Moderator`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Length of every sliding window in seconds.
    pub window_secs: f32,
    /// Messages per peer per window.
    pub max_packets_per_window: u32,
    /// Payload bytes per peer per window.
    pub max_bytes_per_window: u64,
    /// Entities a peer may create per window.
    pub max_spawns_per_window: u32,
    /// Warnings that turn into a ban.
    pub warnings_before_ban: u32,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            window_secs: 1.0,
            max_packets_per_window: 600,
            max_bytes_per_window: 512 * 1024,
            max_spawns_per_window: 40,
            warnings_before_ban: 3,
        }
    }
}

/// What a peer did wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offense {
    /// Too many messages.
    PacketFlood,
    /// Too much data.
    ByteFlood,
    /// Too many entity creations.
    SpawnFlood,
    /// A protocol or admission rule was broken.
    Violation(Violation),
}

/// One warning handed out.
#[derive(Clone, Debug)]
pub struct ModerationReport {
    /// Offending peer.
    pub peer: PeerId,
    /// What they did.
    pub offense: Offense,
    /// Session time.
    pub time: f64,
    /// Warnings the peer holds after this one.
    pub warnings: u32,
    /// Whether this warning ended in a ban.
    pub banned: bool,
}

#[derive(Clone, Debug)]
struct PeerRecord {
    packets: SlidingWindow,
    bytes: SlidingWindow,
    spawns: SlidingWindow,
    warnings: u32,
    /// Session time of the last limit warning.
    last_limit_warning: Option<f64>,
}

impl PeerRecord {
    fn new(span: f32) -> Self {
        Self {
            packets: SlidingWindow::new(span),
            bytes: SlidingWindow::new(span),
            spawns: SlidingWindow::new(span),
            warnings: 0,
            last_limit_warning: None,
        }
    }
}

/// Rate-limiting [`Administration`].
#[derive(Debug, Default)]
pub struct Moderator {
    config: ModerationConfig,
    peers: HashMap<PeerId, PeerRecord>,
    banned: HashSet<PeerId>,
    reports: Vec<ModerationReport>,
}

impl Moderator {
    /// Creates a moderator enforcing `config`.
    #[must_use]
    pub fn new(config: ModerationConfig) -> Self {
        Self {
            config,
            peers: HashMap::new(),
            banned: HashSet::new(),
            reports: Vec::new(),
        }
    }

    /// Limits in force.
    #[must_use]
    pub const fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Warnings `peer` currently holds.
    #[must_use]
    pub fn warnings(&self, peer: PeerId) -> u32 {
        self.peers.get(&peer).map_or(0, |r| r.warnings)
    }

    /// Banned peers.
    pub fn banned(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.banned.iter().copied()
    }

    /// Returns all reports.
    #[must_use]
    pub fn reports(&self) -> &[ModerationReport] {
        &self.reports
    }

    /// Takes ownership of reports.
    pub fn take_reports(&mut self) -> Vec<ModerationReport> {
        std::mem::take(&mut self.reports)
    }

    /// Forgets every peer, ban and report.
    pub fn reset(&mut self) {
        self.peers.clear();
        self.banned.clear();
        self.reports.clear();
    }

    fn record(&mut self, peer: PeerId) -> &mut PeerRecord {
        let span = self.config.window_secs;
        self.peers.entry(peer).or_insert_with(|| PeerRecord::new(span))
    }

    /// An overrun of one of the windows.
    fn overrun(&mut self, peer: PeerId, offense: Offense, now: f64) -> Verdict {
        let span = f64::from(self.config.window_secs);
        let record = self.record(peer);
        if record.last_limit_warning.is_some_and(|at| now - at < span) {
            return Verdict::Drop;
        }
        record.last_limit_warning = Some(now);
        self.warn(peer, offense, now)
    }

    fn warn(&mut self, peer: PeerId, offense: Offense, now: f64) -> Verdict {
        let limit = self.config.warnings_before_ban;
        let record = self.record(peer);
        record.warnings += 1;
        let warnings = record.warnings;
        let banned = warnings >= limit;

        self.reports.push(ModerationReport {
            peer,
            offense,
            time: now,
            warnings,
            banned,
        });
        if banned {
            self.ban(peer);
            Verdict::Ban
        } else {
            tracing::warn!(%peer, ?offense, warnings, limit, "peer warned");
            Verdict::Warn
        }
    }
}

impl Administration for Moderator {
    fn is_banned(&self, peer: PeerId) -> bool {
        self.banned.contains(&peer)
    }

    fn on_traffic(&mut self, peer: PeerId, _kind: PacketType, bytes: usize, now: f64) -> Verdict {
        if self.is_banned(peer) {
            return Verdict::Drop;
        }
        let max_packets = u64::from(self.config.max_packets_per_window);
        let max_bytes = self.config.max_bytes_per_window;
        let record = self.record(peer);
        let packets = record.packets.record(now, 1);
        let volume = record.bytes.record(now, bytes as u64);

        if packets > max_packets {
            self.overrun(peer, Offense::PacketFlood, now)
        } else if volume > max_bytes {
            self.overrun(peer, Offense::ByteFlood, now)
        } else {
            Verdict::Allow
        }
    }

    fn on_violation(&mut self, peer: PeerId, violation: Violation, now: f64) -> Verdict {
        if self.is_banned(peer) {
            return Verdict::Ban;
        }
        self.warn(peer, Offense::Violation(violation), now)
    }

    fn on_entity_created(&mut self, peer: PeerId, ty: EntityType, now: f64) -> Verdict {
        if self.is_banned(peer) {
            return Verdict::Drop;
        }
        let max_spawns = u64::from(self.config.max_spawns_per_window);
        let spawns = self.record(peer).spawns.record(now, 1);
        if spawns > max_spawns {
            tracing::debug!(%peer, ?ty, spawns, "spawn limit reached");
            self.overrun(peer, Offense::SpawnFlood, now)
        } else {
            Verdict::Allow
        }
    }

    fn on_leave(&mut self, peer: PeerId) {
        self.peers.remove(&peer);
    }

    fn ban(&mut self, peer: PeerId) {
        if self.banned.insert(peer) {
            tracing::error!(%peer, "peer banned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEER: PeerId = PeerId(2);

    fn strict() -> ModerationConfig {
        ModerationConfig {
            window_secs: 1.0,
            max_packets_per_window: 5,
            max_bytes_per_window: 1000,
            max_spawns_per_window: 2,
            warnings_before_ban: 3,
        }
    }

    #[test]
    fn test_traffic_within_limits_is_allowed() {
        let mut m = Moderator::new(strict());
        for i in 0..5u8 {
            let now = f64::from(i) * 0.1;
            assert_eq!(m.on_traffic(PEER, PacketType::Snapshot, 100, now), Verdict::Allow);
        }
        assert_eq!(m.warnings(PEER), 0);
    }

    #[test]
    fn test_flood_warns_once_per_window_then_bans() {
        let mut m = Moderator::new(strict());
        let mut verdicts = Vec::new();
        for tick in 0..300u16 {
            let now = f64::from(tick) * 0.01;
            verdicts.push(m.on_traffic(PEER, PacketType::Punch, 10, now));
            if m.is_banned(PEER) {
                break;
            }
        }

        let warns = verdicts.iter().filter(|v| **v == Verdict::Warn).count();
        assert_eq!(warns, 2);
        assert_eq!(verdicts.last(), Some(&Verdict::Ban));
        assert!(verdicts.contains(&Verdict::Drop));
        assert!(m
            .reports()
            .iter()
            .all(|r| r.offense == Offense::PacketFlood));
    }

    #[test]
    fn test_byte_volume_is_limited() {
        let mut m = Moderator::new(strict());
        assert_eq!(m.on_traffic(PEER, PacketType::ImageChunk, 900, 0.0), Verdict::Allow);
        assert_eq!(m.on_traffic(PEER, PacketType::ImageChunk, 200, 0.1), Verdict::Warn);
        assert_eq!(m.reports()[0].offense, Offense::ByteFlood);

        // The window has moved on.
        assert_eq!(m.on_traffic(PEER, PacketType::ImageChunk, 100, 2.0), Verdict::Allow);
    }

    #[test]
    fn test_violations_escalate_to_ban() {
        let mut m = Moderator::new(strict());
        let violation = Violation::HostOnly(PacketType::Kick);
        assert_eq!(m.on_violation(PEER, violation, 0.0), Verdict::Warn);
        assert_eq!(m.on_violation(PEER, violation, 0.0), Verdict::Warn);
        assert_eq!(m.on_violation(PEER, violation, 0.0), Verdict::Ban);
        assert!(m.is_banned(PEER));
        assert!(m.reports().last().is_some_and(|r| r.banned));
    }

    #[test]
    fn test_spawn_rate_is_limited() {
        let mut m = Moderator::new(strict());
        assert_eq!(m.on_entity_created(PEER, EntityType::Coin, 0.0), Verdict::Allow);
        assert_eq!(m.on_entity_created(PEER, EntityType::Coin, 0.0), Verdict::Allow);
        assert_eq!(m.on_entity_created(PEER, EntityType::Coin, 0.0), Verdict::Warn);
        assert_eq!(m.take_reports()[0].offense, Offense::SpawnFlood);
        assert!(m.reports().is_empty());
    }

    #[test]
    fn test_ban_outlives_leave() {
        let mut m = Moderator::new(strict());
        m.ban(PEER);
        m.on_leave(PEER);
        assert!(m.is_banned(PEER));
        assert_eq!(m.on_traffic(PEER, PacketType::Snapshot, 1, 0.0), Verdict::Drop);
        assert_eq!(m.banned().collect::<Vec<_>>(), vec![PEER]);
    }

    #[test]
    fn test_leave_forgets_warnings() {
        let mut m = Moderator::new(strict());
        m.on_violation(PEER, Violation::Malformed(PacketType::Snapshot), 0.0);
        assert_eq!(m.warnings(PEER), 1);
        m.on_leave(PEER);
        assert_eq!(m.warnings(PEER), 0);
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: ModerationConfig = toml::from_str("max_spawns_per_window = 7").unwrap();
        assert_eq!(config.max_spawns_per_window, 7);
        assert_eq!(config.warnings_before_ban, ModerationConfig::default().warnings_before_ban);
    }
}
