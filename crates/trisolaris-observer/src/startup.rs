//! Observer startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] binds eagerly, so a port conflict is reported to
//! the caller instead of surfacing later inside a background task.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// A running observer server.
#[derive(Debug)]
pub struct ObserverServer {
    /// Address actually bound.
    pub addr: SocketAddr,
    /// Background serve task.
    pub handle: JoinHandle<()>,
}

/// Bind `config` and serve on a background Tokio task.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<ObserverServer, ServerError> {
    let listener = server::bind(config).await?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("local address unavailable: {e}")))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");
    Ok(ObserverServer { addr, handle })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use trisolaris_core::{MemoryStore, SessionRegistry, SessionSpawner, SilentNarrator, SimulationConfig};

    use super::*;

    fn state() -> Arc<AppState> {
        let spawner = SessionSpawner::new(
            &SimulationConfig::default(),
            MemoryStore::new(),
            Arc::new(SilentNarrator),
        )
        .unwrap();
        Arc::new(AppState::new(Arc::new(SessionRegistry::new(Arc::new(spawner)))))
    }

    fn local(port: u16) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_owned(),
            port,
        }
    }

    #[tokio::test]
    async fn binds_an_ephemeral_port() {
        let server = spawn_observer(&local(0), state()).await.unwrap();
        assert_ne!(server.addr.port(), 0);
        server.handle.abort();
    }

    #[tokio::test]
    async fn port_conflict_is_reported_eagerly() {
        let first = spawn_observer(&local(0), state()).await.unwrap();
        let second = spawn_observer(&local(first.addr.port()), state()).await;
        assert!(matches!(second, Err(ServerError::Bind(_))));
        first.handle.abort();
    }

    #[tokio::test]
    async fn invalid_host_is_a_bind_error() {
        let config = ServerConfig {
            host: "not an address".to_owned(),
            port: 1,
        };
        assert!(matches!(
            spawn_observer(&config, state()).await,
            Err(ServerError::Bind(_))
        ));
    }
}
