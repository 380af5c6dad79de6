//! Narrator selection.

use trisolaris_core::config::NarrativeConfig;
use trisolaris_narrator::{Narrator, create_narrator};

/// Build the configured narrator, degrading to offline on any error.
pub fn build(config: &NarrativeConfig) -> Narrator {
    match create_narrator(config) {
        Ok(narrator) => {
            tracing::info!(backend = narrator.name(), model = %config.model, "Narrator ready");
            narrator
        }
        Err(e) => {
            tracing::warn!(error = %e, "Narrator unavailable, reports will use fallback text");
            Narrator::Offline
        }
    }
}
