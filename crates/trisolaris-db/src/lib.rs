//! Durable storage for the Trisolaris simulation.
//!
//! Provides [`DragonflyStore`], a [`trisolaris_core::KeyValueStore`] backed by
//! a `Dragonfly` (Redis-compatible) server, so sanity survives restarts and
//! can be shared between engine processes.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` connection and key/value operations
//! - [`error`] -- Connection error type

pub mod dragonfly;
pub mod error;

pub use dragonfly::DragonflyStore;
pub use error::DbError;
