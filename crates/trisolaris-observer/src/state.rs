//! Shared application state for the observer server.

use std::sync::Arc;

use trisolaris_core::observers::DEFAULT_SINK_CAPACITY;
use trisolaris_core::{SessionHandle, SessionRegistry};
use trisolaris_types::WorldId;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. Every
/// route resolves its world through the registry, so HTTP and `WebSocket`
/// traffic for one world always reach the same session task.
#[derive(Clone)]
pub struct AppState {
    /// World-to-session registry.
    pub registry: Arc<SessionRegistry>,
    /// Outbound frame buffer per `WebSocket` connection.
    pub observer_buffer: usize,
}

impl AppState {
    /// Create application state over `registry` with the default buffer.
    pub const fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            observer_buffer: DEFAULT_SINK_CAPACITY,
        }
    }

    /// Override the per-connection frame buffer.
    #[must_use]
    pub fn with_observer_buffer(mut self, frames: usize) -> Self {
        self.observer_buffer = frames;
        self
    }

    /// The session for `world`, created on first use.
    pub fn session(&self, world: &WorldId) -> SessionHandle {
        self.registry.session(world)
    }
}
