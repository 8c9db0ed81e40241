//! Sliding-window counter.

use std::collections::VecDeque;

/// Sum of amounts recorded during the last `span` seconds.
#[derive(Clone, Debug)]
pub struct SlidingWindow {
    span: f32,
    samples: VecDeque<(f64, u64)>,
    total: u64,
}

impl SlidingWindow {
    /// Empty window covering `span` seconds.
    #[must_use]
    pub const fn new(span: f32) -> Self {
        Self {
            span,
            samples: VecDeque::new(),
            total: 0,
        }
    }

    /// Records `amount` at `now` and returns the total inside the window.
    pub fn record(&mut self, now: f64, amount: u64) -> u64 {
        self.expire(now);
        self.samples.push_back((now, amount));
        self.total += amount;
        self.total
    }

    /// Total inside the window at `now`.
    pub fn total(&mut self, now: f64) -> u64 {
        self.expire(now);
        self.total
    }

    fn expire(&mut self, now: f64) {
        while let Some(&(at, amount)) = self.samples.front() {
            if now - at < f64::from(self.span) {
                break;
            }
            self.samples.pop_front();
            self.total -= amount;
        }
    }
}
