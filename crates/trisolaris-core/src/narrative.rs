//! Narrative report seam.
//!
//! A collapse or extinction asks an external provider for prose describing
//! the event. The provider is slow and fallible; the session never waits
//! on it and substitutes [`fallback_message`] whenever generation fails.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which report is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Sanity crossed below the collapse threshold.
    SanityCollapse,
    /// Sanity reached zero.
    Extinction,
}

impl ReportKind {
    /// Stable name used for template lookup and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SanityCollapse => "sanity_collapse",
            Self::Extinction => "extinction",
        }
    }
}

/// Facts handed to the provider for one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportFields {
    /// Display name of the civilization.
    pub civilization: String,
    /// Sanity after the triggering tick, floored.
    pub current_sanity: f64,
    /// Upper bound of the sanity scale.
    pub max_sanity: f64,
    /// Technology level shown in the report.
    pub tech_level: u32,
    /// Population shown in the report.
    pub population: u64,
    /// What triggered the report.
    pub event: String,
    /// Session tick on which the event fired.
    pub tick: u64,
    /// When the session was initialized.
    pub born_at: DateTime<Utc>,
    /// When the event fired.
    pub occurred_at: DateTime<Utc>,
}

/// Errors from a narrative provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NarrativeError {
    /// No provider is configured.
    #[error("narrative provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with an error or an unusable body.
    #[error("narrative provider failed: {0}")]
    Provider(String),

    /// The provider did not answer in time.
    #[error("narrative request timed out after {ms}ms")]
    Timeout {
        /// Configured limit.
        ms: u64,
    },

    /// The provider answered with empty text.
    #[error("narrative provider returned empty text")]
    Empty,
}

/// Produces report text for collapse and extinction events.
pub trait NarrativeProvider: Send + Sync + 'static {
    /// Generate prose for one report.
    fn generate(
        &self,
        kind: ReportKind,
        fields: &ReportFields,
    ) -> impl Future<Output = Result<String, NarrativeError>> + Send;
}

/// Deterministic text used when the provider fails.
pub fn fallback_message(kind: ReportKind, fields: &ReportFields) -> String {
    match kind {
        ReportKind::SanityCollapse => format!(
            "Warning: sanity of {} has fallen to {}/{}. The civilization is on the brink of collapse!",
            fields.civilization, fields.current_sanity, fields.max_sanity
        ),
        ReportKind::Extinction => format!(
            "{} has gone silent at tick {}. Sanity reached zero and the civilization is extinct.",
            fields.civilization, fields.tick
        ),
    }
}

/// Provider that never produces text. Every event uses the fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNarrator;

impl NarrativeProvider for SilentNarrator {
    async fn generate(&self, kind: ReportKind, _fields: &ReportFields) -> Result<String, NarrativeError> {
        Err(NarrativeError::Unavailable(format!(
            "no narrator configured for {}",
            kind.as_str()
        )))
    }
}
