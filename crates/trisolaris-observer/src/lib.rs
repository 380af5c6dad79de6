//! Observer server for the Trisolaris simulation.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoints** (`/ws`, `/ws/{world}`) carrying the tagged
//!   JSON protocol between one observer and one world session
//! - **REST endpoints** for the sanity index and session status
//! - **Plain-text status** at `GET /`
//!
//! # Architecture
//!
//! Routes resolve worlds through a shared
//! [`SessionRegistry`](trisolaris_core::SessionRegistry). A `WebSocket`
//! connection owns an [`ObserverSink`](trisolaris_core::ObserverSink)
//! receiver and forwards whatever the session queues; it never touches
//! simulation state directly.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{ObserverServer, spawn_observer};
pub use state::AppState;
