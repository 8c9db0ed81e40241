//! # TETHER Security
//!
//! Host-side moderation. The server endpoint asks an
//! [`tether_networking::Administration`] about every message, every rule
//! violation and every entity a client creates; [`Moderator`] answers with
//! rate limits and an escalation ladder.
//!
//! ## Architecture
//!
//! ```text
//! CLIENT TRAFFIC                       MODERATOR
//!     │                                    │
//!     │─── message (kind, bytes) ─────────►│ packet + byte windows
//!     │─── violation ─────────────────────►│ straight to a warning
//!     │─── entity created ────────────────►│ spawn window
//!     │                                    │
//!     │                                    ▼
//!     │                          Allow / Drop / Warn / Ban
//!     │                                    │
//!     │◄─── Kick(Banned) on Ban ──────────┤
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod moderation;

pub use moderation::{ModerationConfig, ModerationReport, Moderator, Offense, SlidingWindow};
