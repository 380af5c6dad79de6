//! Error types for the narrator.

use trisolaris_core::NarrativeError;

/// Errors that can occur while producing a report.
#[derive(Debug, thiserror::Error)]
pub enum NarratorError {
    /// The configured backend name is not recognized.
    #[error("unknown narrative backend: {0}")]
    UnknownBackend(String),

    /// The backend requires an API key and none was configured.
    #[error("{0} backend requires an API key")]
    MissingApiKey(&'static str),

    /// The narrator is in offline mode.
    #[error("narrator is offline")]
    Offline,

    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// Failed to build the HTTP client.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<NarratorError> for NarrativeError {
    fn from(err: NarratorError) -> Self {
        match err {
            NarratorError::Offline => Self::Unavailable(err.to_string()),
            other => Self::Provider(other.to_string()),
        }
    }
}
