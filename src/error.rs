//! Error types for the round engine

use thiserror::Error;

/// Failures that can leave the engine's public surface.
///
/// Tick callbacks never produce these: anything that goes wrong inside the
/// session loop is logged and degraded to a safe default instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid round configuration: {0}")]
    InvalidConfig(String),

    #[error("round session is closed")]
    SessionClosed,

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to report round result: {0}")]
    Report(String),
}
