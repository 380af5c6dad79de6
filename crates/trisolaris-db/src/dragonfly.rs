//! `Dragonfly` (Redis-compatible) sanity persistence.
//!
//! Each world keeps two string keys:
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `session:{world}:sanity_index` | JSON number | Current sanity |
//! | `session:{world}:initialized` | JSON bool | Set on first initialization |
//!
//! Key naming lives in [`SanityRecord`](trisolaris_core::SanityRecord); this
//! module only moves strings.

use fred::prelude::*;
use trisolaris_core::{KeyValueStore, StoreError};

use crate::error::DbError;

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
#[derive(Clone)]
pub struct DragonflyStore {
    client: Client,
}

impl DragonflyStore {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the delete fails.
    pub async fn delete(&self, key: &str) -> Result<(), DbError> {
        let _: u32 = self.client.del(key).await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Dragonfly`] if the quit command fails.
    pub async fn close(&self) -> Result<(), DbError> {
        self.client.quit().await?;
        tracing::info!("Dragonfly connection closed");
        Ok(())
    }
}

fn backend(err: &fred::error::Error) -> StoreError {
    StoreError::Backend(format!("Dragonfly: {err}"))
}

impl KeyValueStore for DragonflyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.client.get(key).await.map_err(|e| backend(&e))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let _: () = self
            .client
            .set(key, value.as_str(), None, None, false)
            .await
            .map_err(|e| backend(&e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_url_is_a_config_error() {
        let result = DragonflyStore::connect("not a url").await;
        assert!(matches!(result, Err(DbError::Config(_))));
    }
}
