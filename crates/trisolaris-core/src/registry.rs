//! World-to-session addressing.
//!
//! A process may host several worlds, each with exactly one session. The
//! registry creates a session the first time its world is asked for and
//! hands out clones of the same handle afterwards. A session whose task
//! has stopped is replaced on the next lookup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use trisolaris_types::WorldId;

use crate::config::SimulationConfig;
use crate::narrative::NarrativeProvider;
use crate::session::{SessionError, SessionHandle, SessionSettings, spawn_session};
use crate::store::KeyValueStore;

/// Creates sessions on demand.
pub trait SessionFactory: Send + Sync {
    /// Spawn a new session task for `world`.
    fn spawn(&self, world: &WorldId) -> SessionHandle;
}

/// [`SessionFactory`] sharing one store and one narrator across worlds.
pub struct SessionSpawner<S, N> {
    template: SessionSettings,
    store: S,
    narrator: Arc<N>,
}

impl<S, N> SessionSpawner<S, N> {
    /// Validate the config once and build a spawner from it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidBody`] if a starting body is invalid.
    pub fn new(config: &SimulationConfig, store: S, narrator: Arc<N>) -> Result<Self, SessionError> {
        Ok(Self {
            template: SessionSettings::from_config(config, WorldId::default())?,
            store,
            narrator,
        })
    }
}

impl<S, N> SessionFactory for SessionSpawner<S, N>
where
    S: KeyValueStore + Clone,
    N: NarrativeProvider,
{
    fn spawn(&self, world: &WorldId) -> SessionHandle {
        spawn_session(
            self.template.for_world(world.clone()),
            self.store.clone(),
            Arc::clone(&self.narrator),
        )
    }
}

/// Lazily populated map of world to session.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<WorldId, SessionHandle>>,
    factory: Arc<dyn SessionFactory>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            factory,
        }
    }

    /// The session for `world`, spawning it on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn session(&self, world: &WorldId) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = sessions.get(world) {
            if !handle.is_closed() {
                return handle.clone();
            }
            tracing::warn!(world = %world, "session task gone, respawning");
        }
        let handle = self.factory.spawn(world);
        tracing::info!(world = %world, "session created");
        sessions.insert(world.clone(), handle.clone());
        handle
    }

    /// The session for `world` if it already exists.
    pub fn existing(&self, world: &WorldId) -> Option<SessionHandle> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(world).filter(|h| !h.is_closed()).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.values().filter(|h| !h.is_closed()).count()
    }

    /// `true` when no session has been created.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
