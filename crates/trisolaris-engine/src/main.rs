//! Engine binary for the Trisolaris simulation.
//!
//! Wires the session registry to its store, narrator, and observer
//! server, then waits for Ctrl-C. Sessions themselves are created lazily
//! when the first observer or REST request names their world, and tick
//! only while observed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `trisolaris-config.yaml` (or `TRISOLARIS_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect the sanity store (Dragonfly or memory)
//! 4. Build the narrator (LLM backend or offline)
//! 5. Create the session registry
//! 6. Start the observer server
//! 7. Wait for shutdown

mod error;
mod logging;
mod narrator;
mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use trisolaris_core::{SessionRegistry, SessionSpawner, SimulationConfig};
use trisolaris_observer::{AppState, ServerConfig, spawn_observer};

use crate::error::EngineError;
use crate::store::StoreBackend;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "trisolaris-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the observer server
/// cannot be set up.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging is not up yet, so report the source after.
    let config_path = std::env::var_os("TRISOLARIS_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    logging::init(&config.logging)?;
    info!("trisolaris-engine starting");
    info!(
        path = %config_path.display(),
        from_file,
        civilization = config.world.civilization,
        tick_interval_ms = config.world.tick_interval_ms,
        integrator = ?config.physics.integrator,
        bodies = config.world.bodies.len(),
        "Configuration loaded"
    );

    // 3. Sanity store.
    let store = StoreBackend::connect(&config.infrastructure).await;
    info!(store = store.name(), "Sanity store ready");

    // 4. Narrator.
    let narrator = Arc::new(narrator::build(&config.narrative));

    // 5. Session registry.
    let spawner = SessionSpawner::new(&config, store.clone(), narrator)?;
    let registry = Arc::new(SessionRegistry::new(Arc::new(spawner)));

    // 6. Observer server.
    let state = Arc::new(
        AppState::new(Arc::clone(&registry)).with_observer_buffer(config.world.observer_buffer),
    );
    let server_config = ServerConfig {
        port: config.infrastructure.observer_port,
        ..ServerConfig::default()
    };
    let server = spawn_observer(&server_config, state).await?;
    info!(addr = %server.addr, "Observer server started");

    // 7. Wait for shutdown.
    tokio::signal::ctrl_c()
        .await
        .map_err(|source| EngineError::Signal { source })?;
    info!(worlds = registry.len(), "Shutdown requested");

    server.handle.abort();
    store.close().await;
    info!("trisolaris-engine shutdown complete");
    Ok(())
}

/// Load configuration from `path`, or defaults when it does not exist.
///
/// Environment overrides apply in both cases. The flag reports whether
/// the file was read.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_defaults() {
        let (config, from_file) =
            load_config(Path::new("/nonexistent/trisolaris-config.yaml")).unwrap();
        assert!(!from_file);
        assert_eq!(config.world.civilization, "Trisolaris");
        assert_eq!(config.world.bodies.len(), 3);
    }

    #[test]
    fn file_values_are_used() {
        let path = std::env::temp_dir().join(format!(
            "trisolaris-engine-test-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "world:\n  civilization: Alpha Centauri\n  tick_interval_ms: 50\n")
            .unwrap();
        let (config, from_file) = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(from_file);
        assert_eq!(config.world.civilization, "Alpha Centauri");
        assert_eq!(config.world.tick_interval_ms, 50);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!(
            "trisolaris-engine-bad-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "world: [unclosed\n").unwrap();
        let result = load_config(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(EngineError::Config { .. })));
    }
}
