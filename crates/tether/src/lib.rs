//! # TETHER
//!
//! Runner crate that wires the units together.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         LanSession                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │   host: Server + Moderator          clients: Client × N      │
//! │        │                                   │                 │
//! │        └────────── LoopbackHub ────────────┘                 │
//! │                                                              │
//! │   each node: Session, MockSimulation, Arena                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: the TOML file, one section per unit
//! - `lan`: in-process host plus clients, stepped in lockstep

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod lan;

// Re-export the units
pub use tether_core as core;
pub use tether_networking as networking;
pub use tether_security as security;
pub use tether_shared as shared;

pub use config::{LanConfig, TetherConfig};
pub use error::{ConfigError, TetherError};
pub use lan::{LanNode, LanSession, PeerSummary};
