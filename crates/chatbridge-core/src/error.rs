//! Error types for chatbridge

use thiserror::Error;

/// Faults surfaced to the caller of a chat operation. Upstream model failures
/// never reach this type; they are answered with a fallback reply instead.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;
