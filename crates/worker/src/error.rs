//! Errors for the stdio host protocol.

/// Failures that end the host loop. Event failures are replies, not errors.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("host I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}
