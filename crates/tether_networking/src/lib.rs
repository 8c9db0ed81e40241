//! # TETHER Networking
//!
//! Peer-hosted entity replication. One peer hosts; everyone else joins.
//! Every replicated object has exactly one authoritative peer at a time, and
//! authority can move between peers while the session runs.
//!
//! ## Architecture
//!
//! ```text
//!             ┌───────────────────── Session ──────────────────────┐
//!             │  Lobby   EntityRegistry (+ vendors)   SessionClock │
//!             └──────────────────────────┬──────────────────────────┘
//!                                        │
//!  Transport ──> Endpoint (Server|Client) ──> snapshot / Packet codec
//!                                        │
//!                                   Simulation
//! ```
//!
//! - **Protocol**: position-dependent binary layout, no field tags. Every
//!   `write` has a textually adjacent `read`.
//! - **Entities**: players are their own authority; everything else is an
//!   [`OwnableEntity`] with a lock window against ownership flip-flop.
//! - **Endpoints**: single-threaded, polled once per fixed tick. Inbound
//!   traffic is fully processed before the outbound snapshot is built.
//! - **Memory**: every outgoing message lives in the tick's
//!   [`tether_core::Arena`] and is released at the next tick.
//!
//! ## Error Model
//!
//! A bad message costs exactly that message. Only failures on the sending
//! side (a buffer sized too small) stop a tick.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tether_networking::{Endpoint, LoopbackHub, MockSimulation, NetworkConfig, Server, Session};
//!
//! let hub = LoopbackHub::new(Default::default(), 0);
//! let mut transport = hub.connect(PeerId(1));
//! let mut session = Session::host(PeerId(1), NetworkConfig::default());
//! let mut server = Server::permissive();
//! server.tick(&mut session, &mut sim, &mut transport, &mut arena)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod admin;
pub mod endpoint;
pub mod entity;
pub mod error;
pub mod interpolation;
pub mod lobby;
pub mod ownership;
pub mod policy;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod simulation;
pub mod snapshot;
pub mod transport;

// Re-exports for convenience
pub use admin::{Administration, PermissiveAdministration, Verdict, Violation};
pub use endpoint::{Client, ClientState, Endpoint, NetEvent, Server, ServerStats};
pub use entity::{Damage, Entity, EntityContext, EntityCore, EntityPayload};
pub use error::{AdmissionError, CodecError, CodecResult, NetError, NetResult, TransportError};
pub use lobby::Lobby;
pub use ownership::{OwnableEntity, Ownership};
pub use policy::SpawnPolicy;
pub use protocol::{Packet, Reader, Writer};
pub use registry::EntityRegistry;
pub use session::{NetworkConfig, Session};
pub use simulation::{MockSimulation, ObjectHandle, Simulation};
pub use snapshot::{SnapshotScope, Triple};
pub use transport::{LoopbackHub, LoopbackTransport, NetworkConditions, Transport, TransportStats};
