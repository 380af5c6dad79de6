//! Durable key-value seam and the persisted sanity record.
//!
//! Sessions only ever need two operations, so the store contract is a
//! plain async `get`/`put` over string keys and string values. Values
//! written by this module are JSON numbers.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `session:{world}:sanity_index` | JSON number | Current sanity in `[0, 100]` |
//! | `session:{world}:initialized` | JSON bool | Set once the record has been seeded |

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::RwLock;
use trisolaris_types::WorldId;

use crate::stability::{MAX_SANITY, clamp_sanity};

/// Errors raised by a durable store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing service failed or was unreachable.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("failed to decode value at {key}: {source}")]
    Decode {
        /// Key that held the bad value.
        key: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// A value could not be encoded.
    #[error("failed to encode value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Async string key-value store.
///
/// Implementations must be safe to share between the session task and the
/// HTTP handlers.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value at `key`, `None` if absent.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Write `value` at `key`, replacing any previous value.
    fn put(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// `true` if nothing has been written.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_owned(), value);
        Ok(())
    }
}

/// The persisted sanity index of one world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityRecord {
    sanity_key: String,
    initialized_key: String,
}

impl SanityRecord {
    /// Keys for the given world.
    pub fn for_world(world: &WorldId) -> Self {
        Self {
            sanity_key: format!("session:{world}:sanity_index"),
            initialized_key: format!("session:{world}:initialized"),
        }
    }

    /// Key holding the sanity value.
    pub fn sanity_key(&self) -> &str {
        &self.sanity_key
    }

    /// Key holding the initialization marker.
    pub fn initialized_key(&self) -> &str {
        &self.initialized_key
    }

    /// Read the stored sanity, clamped to `[0, 100]`.
    pub async fn load<S: KeyValueStore>(&self, store: &S) -> Result<Option<f64>, StoreError> {
        let Some(raw) = store.get(&self.sanity_key).await? else {
            return Ok(None);
        };
        let value: f64 = serde_json::from_str(&raw).map_err(|source| StoreError::Decode {
            key: self.sanity_key.clone(),
            source,
        })?;
        Ok(Some(clamp_sanity(value)))
    }

    /// Persist `sanity`.
    pub async fn save<S: KeyValueStore>(&self, store: &S, sanity: f64) -> Result<(), StoreError> {
        let json = serde_json::to_string(&sanity)?;
        store.put(&self.sanity_key, json).await
    }

    /// Seed the record on first use and return the current value.
    ///
    /// Idempotent: an existing value is returned untouched.
    pub async fn initialize<S: KeyValueStore>(&self, store: &S) -> Result<f64, StoreError> {
        if let Some(existing) = self.load(store).await? {
            return Ok(existing);
        }
        self.save(store, MAX_SANITY).await?;
        store
            .put(&self.initialized_key, serde_json::to_string(&true)?)
            .await?;
        Ok(MAX_SANITY)
    }
}
