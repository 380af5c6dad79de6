//! Error types for the observer client.

/// Errors raised while reconciling server state.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Smoothing factor outside `(0, 1]`.
    #[error("smoothing factor must be in (0, 1], got {0}")]
    Smoothing(f64),

    /// An inbound frame could not be decoded.
    #[error("malformed server frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// An outbound message could not be encoded.
    #[error("failed to encode client message: {0}")]
    Encode(serde_json::Error),
}
