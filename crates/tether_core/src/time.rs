//! # Session Time
//!
//! Two clocks drive a replication session:
//!
//! - [`SessionClock`] is the logical clock. It advances by exactly one fixed
//!   step per tick and provides the `now` every ownership lock window and
//!   interpolation weight is measured against.
//! - [`TickLoop`] paces a real-time runner so that ticks happen at the
//!   configured rate on the wall clock.
//!
//! ## Design
//!
//! The logical clock never reads the wall clock, so a session stepped in a
//! test behaves exactly like one paced in real time. Session time is an
//! `f64` derived from the tick count, so one tick stays resolvable after
//! years of play; intervals such as [`SessionClock::step`] stay `f32`.

use std::time::{Duration, Instant};

/// Fixed-step logical clock of one session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SessionClock {
    /// Ticks per second.
    tick_rate: u32,
    /// Ticks completed since the session started.
    tick: u64,
}

impl SessionClock {
    /// Creates a clock at tick zero. A rate of zero is treated as one.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate: tick_rate.max(1),
            tick: 0,
        }
    }

    /// Ticks per second.
    #[inline]
    #[must_use]
    pub const fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Seconds covered by one tick.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn step(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Ticks completed so far.
    #[inline]
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Session time in seconds.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn now(&self) -> f64 {
        self.tick as f64 / f64::from(self.tick_rate)
    }

    /// Moves to the next tick.
    #[inline]
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Rewinds to tick zero (session teardown).
    #[inline]
    pub fn reset(&mut self) {
        self.tick = 0;
    }
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickStats {
    /// Minimum tick duration observed.
    pub min_tick_us: u64,
    /// Maximum tick duration observed.
    pub max_tick_us: u64,
    /// Average tick duration (rolling).
    pub avg_tick_us: u64,
    /// Number of late ticks (took longer than budget).
    pub late_ticks: u64,
    /// Total ticks measured.
    pub total_ticks: u64,
}

/// Wall-clock pacing for a real-time session runner.
pub struct TickLoop {
    /// Target tick duration.
    tick_duration: Duration,
    /// Start of the current tick.
    last_tick: Instant,
    /// Frame time statistics.
    stats: TickStats,
}

impl TickLoop {
    /// Creates a pacing loop for the given rate (ticks per second).
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let tick_duration = Duration::from_micros(1_000_000 / u64::from(tick_rate.max(1)));
        Self {
            tick_duration,
            last_tick: Instant::now(),
            stats: TickStats {
                min_tick_us: u64::MAX,
                ..TickStats::default()
            },
        }
    }

    /// Marks the start of a tick and returns the start instant.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.last_tick = Instant::now();
        self.last_tick
    }

    /// Marks the end of a tick and records its duration.
    pub fn end_tick(&mut self, start: Instant) {
        let duration = start.elapsed();
        let duration_us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        self.stats.total_ticks += 1;
        self.stats.min_tick_us = self.stats.min_tick_us.min(duration_us);
        self.stats.max_tick_us = self.stats.max_tick_us.max(duration_us);
        self.stats.avg_tick_us = (self.stats.avg_tick_us * 15 + duration_us) / 16;

        if duration > self.tick_duration {
            self.stats.late_ticks += 1;
        }
    }

    /// Sleeps until the current tick's budget is used up.
    pub fn wait_for_next_tick(&self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_duration {
            std::thread::sleep(self.tick_duration - elapsed);
        }
    }

    /// Returns tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Returns the target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_fixed_step() {
        let mut clock = SessionClock::new(20);
        assert_eq!(clock.now(), 0.0);

        for _ in 0..20 {
            clock.advance();
        }
        assert_eq!(clock.tick(), 20);
        assert!((clock.now() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_clock_resolves_single_ticks_after_long_sessions() {
        let mut clock = SessionClock::new(30);
        // A week of play.
        for _ in 0..30 * 60 * 60 * 24 * 7 {
            clock.advance();
        }
        let before = clock.now();
        clock.advance();
        let delta = clock.now() - before;
        assert!((delta - f64::from(clock.step())).abs() < 1e-6);
        assert!((before - 604_800.0).abs() < 1e-6);
    }

    #[test]
    fn test_clock_zero_rate_is_clamped() {
        let clock = SessionClock::new(0);
        assert_eq!(clock.tick_rate(), 1);
        assert!((clock.step() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_clock_reset() {
        let mut clock = SessionClock::new(30);
        clock.advance();
        clock.reset();
        assert_eq!(clock.tick(), 0);
    }

    #[test]
    fn test_tick_loop_records_stats() {
        let mut pacing = TickLoop::new(1000);
        let start = pacing.begin_tick();
        pacing.end_tick(start);

        assert_eq!(pacing.stats().total_ticks, 1);
        assert_eq!(pacing.tick_duration(), Duration::from_micros(1000));
    }
}
