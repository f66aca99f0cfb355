//! Error types for the EchoCode session core.

/// Top-level error type for the voice pair-programming core.
///
/// Malformed realtime payloads are deliberately *not* represented here:
/// the normalizer drops unrecognized shapes instead of failing, and the
/// dispatcher converts capability failures into conversation content.
#[derive(Debug, thiserror::Error)]
pub enum EchoError {
    /// Configuration error (missing agent id, bad config file, missing
    /// API key). Raised before any connection attempt is made.
    #[error("config error: {0}")]
    Config(String),

    /// Realtime channel connect or transport error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Code-assist backend error.
    #[error("assist error: {0}")]
    Assist(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EchoError>;
