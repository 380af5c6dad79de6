//! Session controller, stability engine, and tick scheduling for the
//! Trisolaris simulation.
//!
//! This crate owns the authoritative side of a world: one session task
//! per world, driven by a presence-aware tick scheduler, persisting its
//! sanity index through a pluggable store and asking a pluggable narrator
//! for report text.
//!
//! # Modules
//!
//! - [`config`] -- Typed `trisolaris-config.yaml` loader with env overrides.
//! - [`stability`] -- Chaos signal, sanity updates, threshold crossings.
//! - [`store`] -- [`KeyValueStore`] seam, [`MemoryStore`], [`SanityRecord`].
//! - [`narrative`] -- [`NarrativeProvider`] seam and fallback texts.
//! - [`observers`] -- Observer membership and non-blocking fan-out.
//! - [`scheduler`] -- `Stopped | Running` tick timer.
//! - [`session`] -- [`SessionController`], its mailbox, and [`SessionHandle`].
//! - [`registry`] -- One session per world, created on demand.

pub mod config;
pub mod narrative;
pub mod observers;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod stability;
pub mod store;

pub use config::{ConfigError, LogFormat, SimulationConfig};
pub use narrative::{NarrativeError, NarrativeProvider, ReportFields, ReportKind, SilentNarrator};
pub use observers::{ObserverSet, ObserverSink};
pub use registry::{SessionFactory, SessionRegistry, SessionSpawner};
pub use scheduler::TickScheduler;
pub use session::{
    SessionCommand, SessionController, SessionError, SessionHandle, SessionSettings, SessionStatus,
    SimulationState, spawn_session,
};
pub use stability::{MAX_SANITY, StabilityConfig, StabilityEngine};
pub use store::{KeyValueStore, MemoryStore, SanityRecord, StoreError};
