//! # TETHER Core
//!
//! Tick-scoped resources shared by every replication endpoint.
//!
//! ## Architecture Rules
//!
//! 1. **One reservation per message** - outgoing bytes come from the tick arena
//! 2. **Freed once per tick** - `Arena::reset` is the only release point
//! 3. **No views across ticks** - the borrow checker enforces it
//!
//! ## Example
//!
//! ```rust
//! use tether_core::{Arena, SessionClock};
//!
//! let mut arena = Arena::new(1024);
//! let mut clock = SessionClock::new(30);
//!
//! let buffer = arena.alloc(64).unwrap();
//! buffer[0] = 1;
//! arena.reset();
//! clock.advance();
//! assert_eq!(clock.tick(), 1);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod memory;
pub mod time;

pub use memory::{Arena, MemoryError};
pub use time::{SessionClock, TickLoop, TickStats};
