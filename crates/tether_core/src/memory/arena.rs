//! # Arena Allocator
//!
//! A bump allocator for message buffers that are all released at once when
//! the tick ends.
//!
//! ```text
//! tick N:   [ snapshot ][ kick ][ damage ]..............
//!                                         ^ offset
//! reset():  ..............................................
//!           ^ offset
//! ```
//!
//! Every slice handed out borrows the arena mutably, so no writer or reader
//! view can outlive the `reset` that ends the tick.

use thiserror::Error;

/// Failure to reserve message memory.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The reservation does not fit in what is left of the tick budget.
    #[error("arena exhausted: requested {requested} bytes, {remaining} remaining")]
    Exhausted {
        /// Bytes asked for.
        requested: usize,
        /// Bytes still free this tick.
        remaining: usize,
    },
}

/// A bump-pointer arena allocator.
///
/// Allocations are fast (just bump a pointer). Memory is freed all at once
/// when the arena is reset or dropped.
///
/// # Thread Safety
///
/// This arena is NOT thread-safe. Use one arena per endpoint.
pub struct Arena {
    /// The backing storage.
    storage: Box<[u8]>,
    /// Current allocation offset.
    offset: usize,
    /// High-water mark since construction.
    peak: usize,
}

impl Arena {
    /// Creates a new arena with the specified capacity in bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            offset: 0,
            peak: 0,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the current used space in bytes.
    #[inline]
    #[must_use]
    pub const fn used(&self) -> usize {
        self.offset
    }

    /// Returns the remaining free space in bytes.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.offset
    }

    /// Largest `used()` observed across all ticks.
    #[inline]
    #[must_use]
    pub const fn peak(&self) -> usize {
        self.peak
    }

    /// Reserves `len` zeroed bytes for one message.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::Exhausted`] if the reservation does not fit.
    pub fn alloc(&mut self, len: usize) -> Result<&mut [u8], MemoryError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(MemoryError::Exhausted {
                requested: len,
                remaining,
            });
        }

        let start = self.offset;
        self.offset += len;
        self.peak = self.peak.max(self.offset);

        let slice = &mut self.storage[start..self.offset];
        slice.fill(0);
        Ok(slice)
    }

    /// Resets the arena, releasing every reservation made this tick.
    ///
    /// No memory is freed or reallocated.
    #[inline]
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.storage.len())
            .field("used", &self.offset)
            .field("peak", &self.peak)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_allocation() {
        let mut arena = Arena::new(1024);
        let slice = arena.alloc(10).unwrap();
        assert_eq!(slice.len(), 10);
        assert!(slice.iter().all(|&b| b == 0));
        assert_eq!(arena.used(), 10);
    }

    #[test]
    fn test_arena_reset() {
        let mut arena = Arena::new(1024);
        arena.alloc(100).unwrap()[0] = 7;
        assert!(arena.used() > 0);

        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.peak(), 100);

        // Reused memory comes back zeroed.
        assert_eq!(arena.alloc(100).unwrap()[0], 0);
    }

    #[test]
    fn test_arena_exhaustion() {
        let mut arena = Arena::new(64);
        arena.alloc(60).unwrap();

        let err = arena.alloc(8).unwrap_err();
        assert_eq!(
            err,
            MemoryError::Exhausted {
                requested: 8,
                remaining: 4
            }
        );
        // A failed reservation does not move the offset.
        assert_eq!(arena.used(), 60);
    }

    #[test]
    fn test_arena_exact_fit() {
        let mut arena = Arena::new(32);
        assert_eq!(arena.alloc(32).unwrap().len(), 32);
        assert_eq!(arena.remaining(), 0);
        assert!(arena.alloc(0).is_ok());
    }
}
