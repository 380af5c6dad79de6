//! Store selection.
//!
//! Dragonfly is used when `infrastructure.dragonfly_url` is set and
//! reachable; otherwise sessions keep their sanity in process memory.

use trisolaris_core::config::InfrastructureConfig;
use trisolaris_core::{KeyValueStore, MemoryStore, StoreError};
use trisolaris_db::DragonflyStore;

/// The store shared by every session in this process.
#[derive(Clone)]
pub enum StoreBackend {
    /// Process-local map.
    Memory(MemoryStore),
    /// Remote Dragonfly instance.
    Dragonfly(DragonflyStore),
}

impl StoreBackend {
    /// Connect according to `config`, falling back to memory.
    pub async fn connect(config: &InfrastructureConfig) -> Self {
        let Some(url) = config.dragonfly_url.as_deref() else {
            tracing::info!("No Dragonfly URL configured, using in-memory store");
            return Self::Memory(MemoryStore::new());
        };
        match DragonflyStore::connect(url).await {
            Ok(store) => Self::Dragonfly(store),
            Err(e) => {
                tracing::warn!(error = %e, "Dragonfly unavailable, falling back to in-memory store");
                Self::Memory(MemoryStore::new())
            }
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Dragonfly(_) => "dragonfly",
        }
    }

    /// Release remote connections.
    pub async fn close(&self) {
        if let Self::Dragonfly(store) = self {
            if let Err(e) = store.close().await {
                tracing::warn!(error = %e, "Dragonfly close failed");
            }
        }
    }
}

impl KeyValueStore for StoreBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Self::Memory(store) => store.get(key).await,
            Self::Dragonfly(store) => store.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.put(key, value).await,
            Self::Dragonfly(store) => store.put(key, value).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_url_means_memory() {
        let store = StoreBackend::connect(&InfrastructureConfig::default()).await;
        assert_eq!(store.name(), "memory");
        store.put("k", "v".to_owned()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn bad_url_falls_back_to_memory() {
        let config = InfrastructureConfig {
            dragonfly_url: Some("not a url".to_owned()),
            ..InfrastructureConfig::default()
        };
        let store = StoreBackend::connect(&config).await;
        assert_eq!(store.name(), "memory");
        store.close().await;
    }
}
