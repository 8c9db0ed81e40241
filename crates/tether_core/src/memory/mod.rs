//! # Memory Management
//!
//! The per-tick arena that backs every outgoing message.
//!
//! ## Design Philosophy
//!
//! All message memory is reserved once when the session starts. During a tick:
//! - Each message takes one slice from the arena
//! - Running out of space is a sizing bug and surfaces as an error
//! - Everything is released together at the tick boundary

mod arena;

pub use arena::{Arena, MemoryError};
