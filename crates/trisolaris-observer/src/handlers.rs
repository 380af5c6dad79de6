//! REST endpoint handlers.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Plain-text status line |
//! | `GET` | `/api/civilization` | Sanity of the default world |
//! | `GET` | `/api/civilization/{world}` | Sanity of an existing world |
//! | `GET` | `/api/status/{world}` | Session status of an existing world |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use trisolaris_core::{SessionHandle, SessionStatus};
use trisolaris_types::WorldId;

use crate::error::ObserverError;
use crate::state::AppState;

/// Response body of the civilization endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CivilizationResponse {
    /// Current sanity index, `0..=100`.
    pub sanity: f64,
}

/// Plain-text status line.
pub async fn index(State(state): State<Arc<AppState>>) -> String {
    format!(
        "Trisolaris observer running, {} active world(s)\n",
        state.registry.len()
    )
}

/// Sanity of the default world.
///
/// # Errors
///
/// Returns [`ObserverError::Session`] if the session cannot answer.
pub async fn civilization(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CivilizationResponse>, ObserverError> {
    let sanity = state.session(&WorldId::default()).sanity().await?;
    Ok(Json(CivilizationResponse { sanity }))
}

/// Sanity of a world that already has a session.
///
/// # Errors
///
/// Returns [`ObserverError::NotFound`] if the world has no session yet, or
/// [`ObserverError::Session`] if the session cannot answer.
pub async fn civilization_for(
    State(state): State<Arc<AppState>>,
    Path(world): Path<String>,
) -> Result<Json<CivilizationResponse>, ObserverError> {
    let world = WorldId::new(world);
    let sanity = existing(&state, &world)?.sanity().await?;
    Ok(Json(CivilizationResponse { sanity }))
}

/// Status of a world that already has a session.
///
/// # Errors
///
/// Returns [`ObserverError::NotFound`] if the world has no session yet.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(world): Path<String>,
) -> Result<Json<SessionStatus>, ObserverError> {
    let world = WorldId::new(world);
    Ok(Json(existing(&state, &world)?.status().await?))
}

fn existing(state: &AppState, world: &WorldId) -> Result<SessionHandle, ObserverError> {
    state
        .registry
        .existing(world)
        .ok_or_else(|| ObserverError::NotFound(format!("world {world}")))
}
