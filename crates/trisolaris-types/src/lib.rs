//! Shared type definitions for the Trisolaris simulation.
//!
//! This crate holds the types that cross process boundaries: observer
//! and world identifiers, and the tagged JSON envelopes exchanged over
//! the observer transport. Types flow to `TypeScript` via `ts-rs` for
//! browser renderers.
//!
//! # Modules
//!
//! - [`ids`] -- Observer and world identifiers
//! - [`protocol`] -- Server and client message envelopes

pub mod ids;
pub mod protocol;

pub use ids::{DEFAULT_WORLD, ObserverId, WorldId};
pub use protocol::{ClientMessage, InterventionKind, PhysicsFrame, ServerMessage, WireBody};
